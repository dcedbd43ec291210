use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbaImage;

use crate::foundation::core::{ElementId, PixelSize, Rect};
use crate::player::tint::ThemeSource;

/// How an asset is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetKind {
    /// Raster only; no player is created.
    Static,
    /// Vector animation decoded by the worker pool.
    #[default]
    Lottie,
    /// Video decoded by the host; frames are pushed in.
    Video,
}

/// What the asset source returns for one asset id.
#[derive(Clone, Debug, Default)]
pub struct AssetData {
    /// Presentation kind.
    pub kind: AssetKind,
    /// Compressed animation document, passed to the decoder unmodified.
    pub payload: Option<Arc<[u8]>>,
    /// Already-available raster fallback.
    pub thumbnail: Option<Arc<RgbaImage>>,
    /// Cache decoded frames under a hash of the payload instead of the asset id, so several ids
    /// carrying the same document share frames.
    pub content_addressed: bool,
}

/// Byte source for assets. The engine never fetches anything itself.
pub trait AssetSource {
    /// Payload and fallback for `asset`, or `None` when unknown.
    fn fetch(&self, asset: &str) -> Option<AssetData>;
}

/// Read-only view of the host document tree.
pub trait Document {
    /// Whether `element` is attached to the document.
    fn is_connected(&self, element: ElementId) -> bool;

    /// Current layout box of `element` in viewport coordinates (CSS pixels).
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Nearest scrollable ancestor of `element`.
    ///
    /// With `None`, compositors clip to the element's own box instead.
    fn scroll_container(&self, element: ElementId) -> Option<ElementId>;

    /// Size of `element` when a request carries no explicit size.
    fn measured_size(&self, element: ElementId) -> Option<PixelSize> {
        self.bounding_rect(element).map(|r| {
            PixelSize::new(r.width().round().max(0.0) as u32, r.height().round().max(0.0) as u32)
        })
    }
}

/// Everything the engine needs from its embedding application.
pub trait Host: AssetSource + Document + ThemeSource {}

impl<T: AssetSource + Document + ThemeSource> Host for T {}

/// Shared flag telling whether the requester of some work still exists.
///
/// The requester keeps one clone and calls [`Liveness::kill`] on teardown; the engine drops work for
/// dead requesters instead of reporting it.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Liveness {
    /// A live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `true` until [`Liveness::kill`] is called on any clone.
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the requester as gone.
    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}
