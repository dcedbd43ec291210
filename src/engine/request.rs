use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use image::RgbaImage;

use crate::engine::host::Liveness;
use crate::foundation::core::{ElementId, Group, PixelSize, RendererId};
use crate::foundation::error::PlaybackResult;
use crate::player::loader::PlayerOptions;

/// Identity of one [`AnimationRequest`] for its whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// What a request asks the engine to show.
#[derive(Clone, Debug)]
pub struct AnimationRequest {
    /// Asset id passed to the host's asset source.
    pub asset: Arc<str>,
    /// Node the animation is attached to; visibility and document membership are tracked on it.
    pub element: ElementId,
    /// Target size in CSS pixels; measured from `element` when absent.
    pub size: Option<PixelSize>,
    /// Canvases painted with identical pixels.
    pub targets: usize,
    /// Playback options.
    pub options: PlayerOptions,
    /// Scheduling group.
    pub group: Group,
    /// Register with the visibility scheduler. One-shot effects opt out and play unconditionally.
    pub scheduled: bool,
    /// The owner disposes the request itself; leaving the document only deregisters it.
    pub controlled: bool,
    /// Share one decode with every identical occurrence drawn by this renderer.
    pub shared: Option<RendererId>,
    /// Occurrence takes the renderer's text color.
    pub text_colored: bool,
    /// Compound icon driving this player's state transitions.
    pub icon: Option<Arc<str>>,
    /// Requester liveness; work for a dead requester is dropped.
    pub liveness: Option<Liveness>,
    /// Wait for the element to become visible before starting the decode.
    pub lazy: bool,
}

impl AnimationRequest {
    /// Request `asset` attached to `element` with default options.
    pub fn new(asset: impl Into<Arc<str>>, element: ElementId) -> Self {
        Self {
            asset: asset.into(),
            element,
            size: None,
            targets: 1,
            options: PlayerOptions::default(),
            group: Group::CHAT,
            scheduled: true,
            controlled: false,
            shared: None,
            text_colored: false,
            icon: None,
            liveness: None,
            lazy: false,
        }
    }

    /// Explicit target size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some(PixelSize::new(width, height));
        self
    }

    /// Playback options.
    pub fn with_options(mut self, options: PlayerOptions) -> Self {
        self.options = options;
        self
    }

    /// Scheduling group.
    pub fn in_group(mut self, group: Group) -> Self {
        self.group = group;
        self
    }

    /// Draw through a synchronized renderer.
    pub fn shared_in(mut self, renderer: RendererId) -> Self {
        self.shared = Some(renderer);
        self
    }

    /// Drive the player through a registered compound icon.
    pub fn as_icon(mut self, icon: impl Into<Arc<str>>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Attach a requester liveness token.
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Skip the visibility scheduler.
    pub fn unscheduled(mut self) -> Self {
        self.scheduled = false;
        self
    }

    /// Defer the decode until the element becomes visible.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

/// How a render promise resolved.
#[derive(Clone, Debug)]
pub enum Rendered {
    /// The first animated frame was painted.
    FirstFrame,
    /// The asset is static; carries its raster fallback, if any.
    Static(Option<Arc<RgbaImage>>),
    /// No frame arrived within the configured wait.
    TimedOut,
}

/// Returned by [`crate::Engine::request_animation`].
///
/// `render` yields exactly one value unless the request is disposed first, in which case the
/// channel disconnects without a value.
#[derive(Debug)]
pub struct AnimationHandle {
    /// Request identity, used for every later call.
    pub id: RequestId,
    /// Render promise.
    pub render: Receiver<PlaybackResult<Rendered>>,
}
