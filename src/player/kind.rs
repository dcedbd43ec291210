use std::sync::Arc;

use image::RgbaImage;
use smallvec::SmallVec;

use crate::foundation::core::{LoopMode, PixelSize, PlayerId, Rgb};
use crate::foundation::error::{PlaybackError, PlaybackResult};
use crate::player::lottie::AnimationPlayer;
use crate::player::tint::{Tint, ThemeSource, apply_color, apply_inverse};
use crate::player::video::VideoPlayer;

/// Where a player's painted frames go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// One owned canvas per attached target.
    #[default]
    Canvas,
    /// Only the latest frame is kept, for a compositor to pick up.
    Capture,
}

/// Externally visible lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Waiting for decode metadata.
    Loading,
    /// Loaded and paused, never played.
    Ready,
    /// Advancing frames.
    Playing,
    /// Loaded and paused after having played.
    Paused,
    /// Terminal decode failure.
    Failed,
    /// Removed.
    Destroyed,
}

/// Lifecycle notification emitted by a player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerEvent {
    /// Emitting player.
    pub player: PlayerId,
    /// What happened.
    pub kind: PlayerEventKind,
}

/// Kinds of [`PlayerEvent`].
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEventKind {
    /// Decode metadata is known.
    Ready {
        /// Total frames.
        frame_count: u32,
        /// Effective frame rate.
        fps: f64,
    },
    /// The first frame was painted.
    FirstFrame,
    /// A frame was painted.
    EnterFrame(u32),
    /// Decoding failed; the player is terminal.
    Failed(String),
    /// The player was removed.
    Destroyed,
}

/// Paint targets shared by every player variant.
#[derive(Debug, Default)]
pub(crate) struct Surfaces {
    mode: RenderMode,
    canvases: SmallVec<[RgbaImage; 2]>,
    latest: Option<Arc<RgbaImage>>,
}

impl Surfaces {
    pub(crate) fn new(mode: RenderMode, size: PixelSize, targets: usize) -> Self {
        let canvases = match mode {
            RenderMode::Canvas => (0..targets.max(1))
                .map(|_| RgbaImage::new(size.width, size.height))
                .collect(),
            RenderMode::Capture => SmallVec::new(),
        };
        Self {
            mode,
            canvases,
            latest: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn mode(&self) -> RenderMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
        if mode == RenderMode::Capture {
            self.canvases.clear();
        }
    }

    pub(crate) fn canvas(&self, idx: usize) -> Option<&RgbaImage> {
        self.canvases.get(idx)
    }

    pub(crate) fn latest(&self) -> Option<Arc<RgbaImage>> {
        self.latest.clone()
    }

    pub(crate) fn forget_latest(&mut self) {
        self.latest = None;
    }

    /// Copy `bytes` to every target, recolored on the way.
    pub(crate) fn present(
        &mut self,
        size: PixelSize,
        bytes: &[u8],
        color: Option<Rgb>,
        inverse: Option<Rgb>,
    ) -> PlaybackResult<()> {
        if bytes.len() != size.rgba_len() {
            return Err(PlaybackError::validation(format!(
                "frame of {} bytes does not fit {}x{}",
                bytes.len(),
                size.width,
                size.height
            )));
        }
        let mut px = bytes.to_vec();
        if let Some(c) = color {
            apply_color(&mut px, c);
        }
        if let Some(c) = inverse {
            apply_inverse(&mut px, c);
        }
        match self.mode {
            RenderMode::Capture => {
                let img = RgbaImage::from_raw(size.width, size.height, px)
                    .ok_or_else(|| PlaybackError::validation("frame buffer too small"))?;
                self.latest = Some(Arc::new(img));
            }
            RenderMode::Canvas => {
                for canvas in &mut self.canvases {
                    if canvas.dimensions() != (size.width, size.height) {
                        *canvas = RgbaImage::new(size.width, size.height);
                    }
                    canvas.copy_from_slice(&px);
                }
            }
        }
        Ok(())
    }
}

/// Capability surface shared by every player variant.
pub(crate) trait Playable {
    fn state(&self) -> PlayerState;
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self, clear_pending: bool);
    fn set_tint(&mut self, tint: Option<Tint>, themes: &dyn ThemeSource, render_if_paused: bool);
    fn refresh_theme(&mut self, themes: &dyn ThemeSource);
    fn current_frame(&self) -> i64;
    /// At least one frame reached the surfaces.
    fn has_painted(&self) -> bool;
    fn autoplay(&self) -> bool;
    fn set_autoplay(&mut self, autoplay: bool);
    fn loop_mode(&self) -> LoopMode;
    /// Apply the global loop setting; returns `true` when anything changed.
    fn apply_loop_setting(&mut self, enabled: bool) -> bool;
    fn surfaces(&self) -> &Surfaces;
    fn surfaces_mut(&mut self) -> &mut Surfaces;
    fn take_events(&mut self) -> Vec<PlayerEvent>;
}

/// Player variants, dispatched by tag rather than by runtime type checks.
pub(crate) enum PlayerKind {
    Lottie(AnimationPlayer),
    Video(VideoPlayer),
}

impl PlayerKind {
    pub(crate) fn playable(&self) -> &dyn Playable {
        match self {
            Self::Lottie(p) => p,
            Self::Video(p) => p,
        }
    }

    pub(crate) fn playable_mut(&mut self) -> &mut dyn Playable {
        match self {
            Self::Lottie(p) => p,
            Self::Video(p) => p,
        }
    }

    pub(crate) fn as_lottie_mut(&mut self) -> Option<&mut AnimationPlayer> {
        match self {
            Self::Lottie(p) => Some(p),
            Self::Video(_) => None,
        }
    }

    pub(crate) fn as_lottie(&self) -> Option<&AnimationPlayer> {
        match self {
            Self::Lottie(p) => Some(p),
            Self::Video(_) => None,
        }
    }

    pub(crate) fn as_video_mut(&mut self) -> Option<&mut VideoPlayer> {
        match self {
            Self::Video(p) => Some(p),
            Self::Lottie(_) => None,
        }
    }
}
