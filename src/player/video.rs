use image::RgbaImage;

use crate::foundation::core::{LoopMode, PixelSize, PlayerId, Rgb};
use crate::player::kind::{
    Playable, PlayerEvent, PlayerEventKind, PlayerState, RenderMode, Surfaces,
};
use crate::player::tint::{ThemeSource, Tint};

/// Player whose frames are decoded by the host (a video element) and pushed in.
///
/// Shares the capability surface of [`crate::player::lottie::AnimationPlayer`] so it can back a
/// synchronized renderer or be scheduled like any other animation.
pub(crate) struct VideoPlayer {
    id: PlayerId,
    size: PixelSize,
    paused: bool,
    has_played: bool,
    destroyed: bool,
    autoplay: bool,
    original_autoplay: bool,
    loop_mode: LoopMode,
    original_loop: LoopMode,
    surfaces: Surfaces,
    tint: Option<Tint>,
    color: Option<Rgb>,
    last: Option<RgbaImage>,
    frame_no: u32,
    painted_any: bool,
    events: Vec<PlayerEvent>,
}

impl VideoPlayer {
    pub(crate) fn new(
        id: PlayerId,
        size: PixelSize,
        mode: RenderMode,
        targets: usize,
        loop_mode: LoopMode,
        autoplay: bool,
    ) -> Self {
        Self {
            id,
            size,
            paused: true,
            has_played: false,
            destroyed: false,
            autoplay,
            original_autoplay: autoplay,
            loop_mode,
            original_loop: loop_mode,
            surfaces: Surfaces::new(mode, size, targets),
            tint: None,
            color: None,
            last: None,
            frame_no: 0,
            painted_any: false,
            events: Vec::new(),
        }
    }

    /// Accept the next decoded frame from the host.
    pub(crate) fn push_frame(&mut self, frame: RgbaImage) {
        if self.destroyed {
            return;
        }
        let size = PixelSize::new(frame.width(), frame.height());
        if let Err(e) = self.surfaces.present(size, frame.as_raw(), self.color, None) {
            tracing::warn!(id = %self.id, error = %e, "video paint failed");
            return;
        }
        self.size = size;
        self.last = Some(frame);
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::EnterFrame(self.frame_no),
        });
        if !self.painted_any {
            self.painted_any = true;
            self.events.push(PlayerEvent {
                player: self.id,
                kind: PlayerEventKind::FirstFrame,
            });
        }
        self.frame_no = self.frame_no.wrapping_add(1);
    }

    /// Host signals the end of the stream.
    pub(crate) fn on_ended(&mut self) {
        if self.loop_mode.is_looping() {
            self.frame_no = 0;
        } else {
            self.pause(false);
            self.autoplay = false;
        }
    }

    pub(crate) fn remove(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.paused = true;
        self.last = None;
        self.surfaces.forget_latest();
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::Destroyed,
        });
    }

    fn repaint_last(&mut self) {
        if let Some(frame) = &self.last
            && let Err(e) = self.surfaces.present(self.size, frame.as_raw(), self.color, None)
        {
            tracing::warn!(id = %self.id, error = %e, "video repaint failed");
        }
    }
}

impl Playable for VideoPlayer {
    fn state(&self) -> PlayerState {
        if self.destroyed {
            PlayerState::Destroyed
        } else if !self.painted_any && self.paused {
            PlayerState::Loading
        } else if !self.paused {
            PlayerState::Playing
        } else if self.has_played {
            PlayerState::Paused
        } else {
            PlayerState::Ready
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        if self.destroyed || !self.paused {
            return;
        }
        self.paused = false;
        self.has_played = true;
    }

    fn pause(&mut self, _clear_pending: bool) {
        self.paused = true;
    }

    fn set_tint(&mut self, tint: Option<Tint>, themes: &dyn ThemeSource, render_if_paused: bool) {
        self.color = tint.as_ref().and_then(|t| t.resolve(themes));
        self.tint = tint;
        if render_if_paused && self.paused {
            self.repaint_last();
        }
    }

    fn refresh_theme(&mut self, themes: &dyn ThemeSource) {
        if let Some(tint @ Tint::Theme(_)) = &self.tint {
            self.color = tint.resolve(themes);
            self.repaint_last();
        }
    }

    fn current_frame(&self) -> i64 {
        i64::from(self.frame_no)
    }

    fn has_painted(&self) -> bool {
        self.painted_any
    }

    fn autoplay(&self) -> bool {
        self.autoplay
    }

    fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    fn apply_loop_setting(&mut self, enabled: bool) -> bool {
        if !self.original_loop.is_looping() || self.loop_mode.is_looping() == enabled {
            return false;
        }
        self.loop_mode = if enabled {
            self.original_loop
        } else {
            LoopMode::Once
        };
        self.autoplay = self.original_autoplay;
        true
    }

    fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    fn surfaces_mut(&mut self) -> &mut Surfaces {
        &mut self.surfaces
    }

    fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }
}
