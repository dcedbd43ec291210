use std::time::{Duration, Instant};

use crate::cache::frames::{CacheKey, FrameCache, FrameCacheEntry, FrameData};
use crate::foundation::config::FrameStorage;
use crate::foundation::core::{Direction, LoopMode, PixelSize, PlayerId, Rgb};
use crate::player::kind::{
    Playable, PlayerEvent, PlayerEventKind, PlayerState, RenderMode, Surfaces,
};
use crate::player::policy::{CachePolicy, adjust_skip_for_fps};
use crate::player::tint::{ThemeSource, Tint};
use crate::worker::pool::WorkerPool;
use crate::worker::protocol::CancelToken;

/// Invoked once when a bounded run reaches its target frame.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Shared state a player needs to talk to workers and the frame cache.
pub(crate) struct PlayerCtx<'a> {
    pub(crate) pool: &'a mut WorkerPool,
    pub(crate) cache: &'a mut FrameCache,
    pub(crate) storage: FrameStorage,
}

/// Frame storage of one player: a shared cache entry, or a private one for unnamed payloads.
pub(crate) enum FrameSlot {
    Shared(CacheKey),
    Private(FrameCacheEntry),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Loading,
    Loaded,
    Failed,
    Destroyed,
}

struct BoundedRun {
    target: u32,
    callback: Option<FrameCallback>,
}

struct DeferredRun {
    from: Option<i64>,
    to: u32,
    direction: Option<Direction>,
    speed: Option<f64>,
    callback: Option<FrameCallback>,
}

/// Construction parameters decided by the loader.
pub(crate) struct PlayerInit {
    pub(crate) id: PlayerId,
    pub(crate) size: PixelSize,
    pub(crate) skip: u32,
    pub(crate) policy: CachePolicy,
    pub(crate) frames: FrameSlot,
    pub(crate) loop_mode: LoopMode,
    pub(crate) autoplay: bool,
    pub(crate) self_driven: bool,
    pub(crate) init_frame: Option<i64>,
    pub(crate) tint: Option<Tint>,
    pub(crate) color: Option<Rgb>,
    pub(crate) inverse: Option<Rgb>,
    pub(crate) skip_first_frame: bool,
    pub(crate) mode: RenderMode,
    pub(crate) targets: usize,
    pub(crate) token: CancelToken,
}

/// Per-instance playback state machine over one worker conversation.
///
/// Frames are requested one at a time: the next frame is requested right after the previous one is
/// painted, and held until its paint deadline (`next_paint_at`) when it arrives early.
pub(crate) struct AnimationPlayer {
    id: PlayerId,
    size: PixelSize,
    lifecycle: Lifecycle,
    paused: bool,
    has_played: bool,

    cur: i64,
    min: i64,
    max: i64,
    init_frame: Option<i64>,
    frame_count: u32,
    fps: f64,
    direction: Direction,
    speed: f64,
    skip: u32,

    loop_mode: LoopMode,
    original_loop: LoopMode,
    laps_left: u32,
    autoplay: bool,
    original_autoplay: bool,
    self_driven: bool,

    policy: CachePolicy,
    frames: FrameSlot,
    surfaces: Surfaces,
    tint: Option<Tint>,
    color: Option<Rgb>,
    inverse: Option<Rgb>,
    skip_first_frame: bool,

    interval: Duration,
    next_paint_at: Option<Instant>,
    last_paint_at: Option<Instant>,
    need_advance: bool,
    in_flight: Option<u32>,
    staged: Option<(u32, FrameData)>,
    last: Option<(u32, FrameData)>,
    recycled: Option<Vec<u8>>,
    painted_any: bool,

    bounded: Option<BoundedRun>,
    deferred: Option<DeferredRun>,
    token: CancelToken,
    events: Vec<PlayerEvent>,
}

fn laps_for(mode: LoopMode) -> u32 {
    match mode {
        LoopMode::Times(n) => n.get(),
        LoopMode::Once | LoopMode::Forever => 0,
    }
}

impl AnimationPlayer {
    pub(crate) fn new(init: PlayerInit) -> Self {
        Self {
            id: init.id,
            size: init.size,
            lifecycle: Lifecycle::Loading,
            paused: true,
            has_played: false,
            cur: 0,
            min: 0,
            max: 0,
            init_frame: init.init_frame,
            frame_count: 0,
            fps: 60.0,
            direction: Direction::Forward,
            speed: 1.0,
            skip: init.skip.max(1),
            loop_mode: init.loop_mode,
            original_loop: init.loop_mode,
            laps_left: laps_for(init.loop_mode),
            autoplay: init.autoplay,
            original_autoplay: init.autoplay,
            self_driven: init.self_driven,
            policy: init.policy,
            frames: init.frames,
            surfaces: Surfaces::new(init.mode, init.size, init.targets),
            tint: init.tint,
            color: init.color,
            inverse: init.inverse,
            skip_first_frame: init.skip_first_frame,
            interval: Duration::ZERO,
            next_paint_at: None,
            last_paint_at: None,
            need_advance: false,
            in_flight: None,
            staged: None,
            last: None,
            recycled: None,
            painted_any: false,
            bounded: None,
            deferred: None,
            token: init.token,
            events: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[cfg(test)]
    pub(crate) fn bounds(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    #[cfg(test)]
    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn cache_key(&self) -> Option<&CacheKey> {
        match &self.frames {
            FrameSlot::Shared(key) => Some(key),
            FrameSlot::Private(_) => None,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !matches!(self.lifecycle, Lifecycle::Failed | Lifecycle::Destroyed)
    }

    pub(crate) fn set_self_driven(&mut self, v: bool) {
        self.self_driven = v;
    }

    pub(crate) fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
        self.laps_left = laps_for(mode);
    }

    fn recompute_interval(&mut self) {
        let secs = f64::from(self.skip) / self.fps.max(1.0) / self.speed;
        self.interval = Duration::from_secs_f64(secs.max(0.0));
    }

    fn is_due(&self, now: Instant) -> bool {
        self.next_paint_at.is_none_or(|t| now >= t)
    }

    fn rearm(&mut self) {
        if !self.paused && self.painted_any && self.in_flight.is_none() && self.staged.is_none() {
            self.need_advance = true;
        }
    }

    fn reset_frame(&self) -> i64 {
        self.init_frame.unwrap_or(match self.direction {
            Direction::Forward => self.min,
            Direction::Backward => self.max,
        })
    }

    /// Stop advancing. With `clear_pending`, a frame held for its deadline is dropped too.
    pub(crate) fn pause(&mut self, clear_pending: bool) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.need_advance = false;
        if clear_pending {
            self.staged = None;
        }
        tracing::trace!(id = %self.id, frame = self.cur, "pause");
    }

    pub(crate) fn play(&mut self) {
        if !self.paused || !self.is_alive() {
            return;
        }
        self.paused = false;
        self.has_played = true;
        self.next_paint_at = None;
        self.rearm();
        tracing::trace!(id = %self.id, frame = self.cur, "play");
    }

    /// Pause and rewind to the start of the active range.
    pub(crate) fn stop(&mut self, render_first: bool, now: Instant, ctx: &mut PlayerCtx<'_>) {
        self.pause(true);
        self.cur = self.reset_frame();
        if render_first && self.lifecycle == Lifecycle::Loaded {
            self.request_frame(self.cur, now, ctx);
        }
    }

    pub(crate) fn restart(&mut self, now: Instant, ctx: &mut PlayerCtx<'_>) {
        self.stop(false, now, ctx);
        self.play();
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 || self.speed == speed {
            return;
        }
        self.speed = speed;
        self.recompute_interval();
        if let Some(last) = self.last_paint_at {
            self.next_paint_at = Some(last + self.interval);
        }
        self.rearm();
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        if self.direction == direction {
            return;
        }
        self.direction = direction;
        self.rearm();
    }

    /// Move the playhead without painting.
    #[cfg(test)]
    pub(crate) fn set_current_frame(&mut self, frame: i64) {
        self.cur = frame;
    }

    /// Move the playhead and paint that frame.
    pub(crate) fn seek(&mut self, frame: u32, now: Instant, ctx: &mut PlayerCtx<'_>) {
        if self.lifecycle != Lifecycle::Loaded {
            self.init_frame = Some(i64::from(frame));
            return;
        }
        self.cur = i64::from(frame).clamp(self.min, self.max);
        self.next_paint_at = None;
        self.request_frame(self.cur, now, ctx);
    }

    /// Run from the current frame to `target` once, then pause.
    pub(crate) fn play_to_frame(
        &mut self,
        target: u32,
        direction: Option<Direction>,
        speed: Option<f64>,
        callback: Option<FrameCallback>,
    ) {
        if self.lifecycle == Lifecycle::Loading {
            self.deferred = Some(DeferredRun {
                from: None,
                to: target,
                direction,
                speed,
                callback,
            });
            return;
        }
        if !self.is_alive() {
            return;
        }
        self.pause(true);
        let target_i = i64::from(target.min(self.frame_count.saturating_sub(1)));
        let direction = direction.unwrap_or_else(|| Direction::toward(self.cur, target_i));
        self.set_direction(direction);
        if let Some(s) = speed {
            self.set_speed(s);
        }
        let (lo, hi) = match direction {
            Direction::Forward => (self.cur, target_i),
            Direction::Backward => (target_i, self.cur),
        };
        self.set_loop_mode(LoopMode::Once);
        self.min = lo;
        self.max = hi;
        self.bounded = Some(BoundedRun {
            target: target_i as u32,
            callback,
        });
        self.play();
    }

    /// Play the range `from..=to` once.
    pub(crate) fn play_part(&mut self, from: u32, to: u32, callback: Option<FrameCallback>) {
        if self.lifecycle == Lifecycle::Loading {
            self.deferred = Some(DeferredRun {
                from: Some(i64::from(from)),
                to,
                direction: None,
                speed: None,
                callback,
            });
            return;
        }
        self.pause(true);
        let direction = Direction::toward(i64::from(from), i64::from(to));
        self.cur = i64::from(from) - direction.sign();
        self.play_to_frame(to, Some(direction), None, callback);
    }

    pub(crate) fn set_inverse(&mut self, inverse: Option<Rgb>) {
        self.inverse = inverse;
    }

    fn repaint_last(&mut self) {
        let Some((_, data)) = &self.last else {
            return;
        };
        if let Err(e) = self
            .surfaces
            .present(self.size, data.as_bytes(), self.color, self.inverse)
        {
            tracing::warn!(id = %self.id, error = %e, "repaint failed");
        }
    }

    pub(crate) fn on_load(
        &mut self,
        frame_count: u32,
        fps: f64,
        now: Instant,
        ctx: &mut PlayerCtx<'_>,
    ) {
        if self.lifecycle != Lifecycle::Loading {
            return;
        }
        self.lifecycle = Lifecycle::Loaded;
        self.frame_count = frame_count;
        self.fps = fps;
        self.min = 0;
        self.max = i64::from(frame_count.saturating_sub(1));
        self.init_frame = self.init_frame.map(|f| f.clamp(self.min, self.max));
        self.cur = self.reset_frame();
        if fps < 60.0 && self.skip != 1 {
            self.skip = adjust_skip_for_fps(self.skip, fps);
        }
        self.recompute_interval();
        self.next_paint_at = None;
        tracing::debug!(id = %self.id, frame_count, fps, skip = self.skip, "player ready");
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::Ready { frame_count, fps },
        });
        if !self.skip_first_frame {
            self.request_frame(self.cur, now, ctx);
        }
        if let Some(run) = self.deferred.take() {
            match run.from {
                Some(from) => self.play_part(from as u32, run.to, run.callback),
                None => self.play_to_frame(run.to, run.direction, run.speed, run.callback),
            }
        }
    }

    pub(crate) fn on_frame(
        &mut self,
        frame: u32,
        pixels: Vec<u8>,
        now: Instant,
        ctx: &mut PlayerCtx<'_>,
    ) {
        if self.lifecycle != Lifecycle::Loaded {
            return;
        }
        if self.in_flight == Some(frame) {
            self.in_flight = None;
        }
        let Some(data) = FrameData::from_pixels(self.size, pixels, ctx.storage) else {
            self.on_error(format!("frame {frame} has the wrong byte length"));
            return;
        };
        if self.policy.should_store(frame) {
            let entry = match &mut self.frames {
                FrameSlot::Shared(key) => ctx.cache.get_mut(key),
                FrameSlot::Private(entry) => Some(entry),
            };
            if let Some(entry) = entry
                && !entry.contains(frame)
            {
                entry.insert(frame, data.clone());
            }
        }
        self.deliver(frame, data, now);
    }

    pub(crate) fn on_error(&mut self, reason: String) {
        if !self.is_alive() {
            return;
        }
        tracing::warn!(id = %self.id, %reason, "player failed");
        self.lifecycle = Lifecycle::Failed;
        self.paused = true;
        self.need_advance = false;
        self.staged = None;
        self.in_flight = None;
        self.bounded = None;
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::Failed(reason),
        });
    }

    pub(crate) fn tick(&mut self, now: Instant, ctx: &mut PlayerCtx<'_>) {
        if self.lifecycle != Lifecycle::Loaded {
            return;
        }
        self.paint_staged_if_due(now);
        if self.need_advance && !self.paused && self.in_flight.is_none() && self.staged.is_none() {
            self.need_advance = false;
            self.advance(now, ctx);
            self.paint_staged_if_due(now);
        }
    }

    /// Drop cached frames unless they are cheap to keep or still shown elsewhere.
    pub(crate) fn clear_cache(&mut self, cache: &mut FrameCache) {
        if self.policy == CachePolicy::Every {
            return;
        }
        match &mut self.frames {
            FrameSlot::Shared(key) => {
                if cache.counter(key) > 1 {
                    return;
                }
                if let Some(entry) = cache.get_mut(key) {
                    entry.clear();
                }
            }
            FrameSlot::Private(entry) => entry.clear(),
        }
    }

    pub(crate) fn remove(&mut self, ctx: &mut PlayerCtx<'_>) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.pause(true);
        self.token.cancel();
        ctx.pool.destroy(self.id);
        if let FrameSlot::Shared(key) = &self.frames {
            ctx.cache.release(key);
        }
        self.lifecycle = Lifecycle::Destroyed;
        self.staged = None;
        self.in_flight = None;
        self.last = None;
        self.bounded = None;
        self.deferred = None;
        self.surfaces.forget_latest();
        tracing::debug!(id = %self.id, "player destroyed");
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::Destroyed,
        });
    }

    fn wraps(&self) -> bool {
        match self.loop_mode {
            LoopMode::Once => false,
            LoopMode::Forever => true,
            LoopMode::Times(_) => self.laps_left > 0,
        }
    }

    /// Called after the last frame of a lap was requested. Returns `false` when playback ends.
    fn on_lap(&mut self) -> bool {
        let keep_going = match self.loop_mode {
            LoopMode::Forever => true,
            LoopMode::Once => false,
            LoopMode::Times(_) => {
                self.laps_left = self.laps_left.saturating_sub(1);
                self.laps_left > 0
            }
        };
        if !keep_going {
            self.pause(false);
        }
        keep_going
    }

    fn advance(&mut self, now: Instant, ctx: &mut PlayerCtx<'_>) {
        let skip = i64::from(self.skip);
        let (frame, at_boundary) = match self.direction {
            Direction::Forward => {
                if self.cur + skip > self.max {
                    self.cur = if self.wraps() { self.min } else { self.max };
                } else {
                    self.cur += skip;
                }
                (self.cur, self.cur + skip > self.max)
            }
            Direction::Backward => {
                if self.cur - skip < self.min {
                    self.cur = if self.wraps() { self.max } else { self.min };
                } else {
                    self.cur -= skip;
                }
                (self.cur, self.cur - skip < self.min)
            }
        };
        self.request_frame(frame, now, ctx);
        if at_boundary && !self.on_lap() && self.autoplay {
            self.autoplay = false;
        }
    }

    fn request_frame(&mut self, frame: i64, now: Instant, ctx: &mut PlayerCtx<'_>) {
        let Ok(frame) = u32::try_from(frame) else {
            return;
        };
        if frame >= self.frame_count {
            return;
        }
        let cached = match &self.frames {
            FrameSlot::Shared(key) => ctx.cache.get(key).and_then(|e| e.get(frame)),
            FrameSlot::Private(entry) => entry.get(frame),
        };
        if let Some(data) = cached {
            self.deliver(frame, data, now);
            return;
        }
        match ctx.pool.render_frame(self.id, frame, self.recycled.take()) {
            Ok(()) => self.in_flight = Some(frame),
            Err(e) => self.on_error(e.to_string()),
        }
    }

    fn deliver(&mut self, frame: u32, data: FrameData, now: Instant) {
        if self.is_due(now) {
            self.paint(frame, data, now);
        } else {
            self.staged = Some((frame, data));
        }
    }

    fn paint_staged_if_due(&mut self, now: Instant) {
        if self.staged.is_some()
            && self.is_due(now)
            && let Some((frame, data)) = self.staged.take()
        {
            self.paint(frame, data, now);
        }
    }

    fn paint(&mut self, frame: u32, data: FrameData, now: Instant) {
        if let Err(e) = self
            .surfaces
            .present(self.size, data.as_bytes(), self.color, self.inverse)
        {
            tracing::warn!(id = %self.id, frame, error = %e, "paint failed");
            self.autoplay = false;
            self.pause(true);
            return;
        }
        if let Some((_, old)) = self.last.replace((frame, data))
            && self.recycled.is_none()
        {
            self.recycled = old.into_recyclable();
        }
        self.events.push(PlayerEvent {
            player: self.id,
            kind: PlayerEventKind::EnterFrame(frame),
        });
        if !self.painted_any {
            self.painted_any = true;
            self.events.push(PlayerEvent {
                player: self.id,
                kind: PlayerEventKind::FirstFrame,
            });
            if self.self_driven && self.autoplay {
                self.play();
            }
        }
        self.last_paint_at = Some(now);
        self.next_paint_at = Some(now + self.interval);
        if self.bounded.as_ref().is_some_and(|b| b.target == frame)
            && let Some(run) = self.bounded.take()
            && let Some(cb) = run.callback
        {
            cb();
        }
        self.need_advance = !self.paused;
    }
}

impl Playable for AnimationPlayer {
    fn state(&self) -> PlayerState {
        match self.lifecycle {
            Lifecycle::Loading => PlayerState::Loading,
            Lifecycle::Failed => PlayerState::Failed,
            Lifecycle::Destroyed => PlayerState::Destroyed,
            Lifecycle::Loaded if !self.paused => PlayerState::Playing,
            Lifecycle::Loaded if self.has_played => PlayerState::Paused,
            Lifecycle::Loaded => PlayerState::Ready,
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        AnimationPlayer::play(self);
    }

    fn pause(&mut self, clear_pending: bool) {
        AnimationPlayer::pause(self, clear_pending);
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
        self.cur
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
        let mode = if enabled {
            self.original_loop
        } else {
            LoopMode::Once
        };
        self.set_loop_mode(mode);
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

/// Frame slot backed by the shared cache; takes one reference on `key`.
pub(crate) fn shared_slot(
    cache: &mut FrameCache,
    key: CacheKey,
    class: crate::cache::frames::CacheClass,
) -> FrameSlot {
    cache.acquire(&key, class);
    FrameSlot::Shared(key)
}

pub(crate) fn private_slot() -> FrameSlot {
    FrameSlot::Private(FrameCacheEntry::default())
}

#[cfg(test)]
#[path = "../../tests/unit/player/lottie.rs"]
mod tests;
