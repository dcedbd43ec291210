use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::cache::frames::{CacheClass, CacheKey, FrameCache};
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{Direction, LoopMode, PixelSize, PlayerId, Rgb};
use crate::foundation::error::{PlaybackError, PlaybackResult};
use crate::player::kind::{Playable, PlayerEvent, PlayerKind, PlayerState, RenderMode};
use crate::player::lottie::{
    AnimationPlayer, FrameCallback, PlayerCtx, PlayerInit, private_slot, shared_slot,
};
use crate::player::policy::{CachePolicy, scale_for_display, skip_delta};
use crate::player::tint::{ThemeSource, Tint};
use crate::player::video::VideoPlayer;
use crate::worker::decoder::DecoderFactory;
use crate::worker::pool::{WorkerPool, WorkerStats};
use crate::worker::protocol::{CancelToken, LoadRequest, WorkerReply};

/// Playback options of one animation request.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerOptions {
    /// Loop behavior.
    pub loop_mode: LoopMode,
    /// Start playing as soon as the scheduler admits the player.
    pub autoplay: bool,
    /// Recolor every frame.
    pub tint: Option<Tint>,
    /// Coverage-inverting recolor.
    pub inverse: Option<Rgb>,
    /// Keep no decoded frames.
    pub no_cache: bool,
    /// Render at full pixel ratio regardless of size.
    pub upscale: bool,
    /// Explicit frame-skip ratio (`0.5` = every other frame).
    pub skip_ratio: Option<f64>,
    /// Frame shown first and returned to on stop.
    pub init_frame: Option<u32>,
    /// Skin-tone index, honored in `1..=5`.
    pub tone: Option<u8>,
    /// Do not paint a frame right after load.
    pub skip_first_frame: bool,
    /// Reuse a live player with the same cache key instead of decoding again.
    pub sync: bool,
    /// Keep decoded frames after the last user is gone.
    pub small_icon: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            loop_mode: LoopMode::Forever,
            autoplay: true,
            tint: None,
            inverse: None,
            no_cache: false,
            upscale: false,
            skip_ratio: None,
            init_frame: None,
            tone: None,
            skip_first_frame: false,
            sync: false,
            small_icon: false,
        }
    }
}

/// Everything needed to start one decode conversation.
pub(crate) struct LoadParams<'a> {
    pub(crate) name: Option<Arc<str>>,
    pub(crate) payload: Arc<[u8]>,
    pub(crate) size: PixelSize,
    pub(crate) targets: usize,
    pub(crate) mode: RenderMode,
    pub(crate) self_driven: bool,
    pub(crate) options: &'a PlayerOptions,
}

const PUMP_ROUNDS: usize = 4;

/// Owner of every live player, the decode pool and the frame cache.
pub(crate) struct PlayerRegistry {
    config: EngineConfig,
    pool: WorkerPool,
    cache: FrameCache,
    players: BTreeMap<PlayerId, PlayerKind>,
    by_cache_key: HashMap<CacheKey, PlayerId>,
    next_id: u64,
    events: Vec<PlayerEvent>,
}

impl PlayerRegistry {
    pub(crate) fn new(
        config: &EngineConfig,
        factory: Arc<dyn DecoderFactory>,
    ) -> PlaybackResult<Self> {
        Ok(Self {
            config: config.clone(),
            pool: WorkerPool::new(config.workers, config.worker_mode, factory)?,
            cache: FrameCache::new(),
            players: BTreeMap::new(),
            by_cache_key: HashMap::new(),
            next_id: 0,
            events: Vec::new(),
        })
    }

    fn alloc_id(&mut self) -> PlayerId {
        self.next_id += 1;
        PlayerId(self.next_id)
    }

    pub(crate) fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub(crate) fn stats(&self) -> WorkerStats {
        self.pool.stats()
    }

    pub(crate) fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Start decoding an animation and return its player.
    pub(crate) fn load(
        &mut self,
        params: LoadParams<'_>,
        themes: &dyn ThemeSource,
    ) -> PlaybackResult<PlayerId> {
        let opts = params.options;
        if params.size.is_empty() {
            return Err(PlaybackError::size(format!(
                "cannot create a player at {}x{}",
                params.size.width, params.size.height
            )));
        }
        let device = self.config.device;
        let scaled = scale_for_display(&device, params.size, opts.upscale);
        let skip = skip_delta(&device, params.size, opts.upscale, opts.skip_ratio);
        let policy = CachePolicy::for_surface(&device, scaled, opts.no_cache);

        let key = params.name.as_ref().map(|name| {
            CacheKey::new(
                Arc::clone(name),
                scaled,
                opts.tint.as_ref().map(Tint::cache_tag),
                opts.tone,
            )
        });

        if opts.sync
            && let Some(key) = &key
            && let Some(&existing) = self.by_cache_key.get(key)
            && self
                .players
                .get(&existing)
                .and_then(PlayerKind::as_lottie)
                .is_some_and(AnimationPlayer::is_alive)
        {
            tracing::debug!(id = %existing, key = %key, "reusing live player");
            return Ok(existing);
        }

        let id = self.alloc_id();
        let class = if opts.small_icon {
            CacheClass::SmallIcon
        } else {
            CacheClass::Regular
        };
        let frames = match &key {
            Some(key) => shared_slot(&mut self.cache, key.clone(), class),
            None => private_slot(),
        };
        let token = CancelToken::new();
        let player = AnimationPlayer::new(PlayerInit {
            id,
            size: scaled,
            skip,
            policy,
            frames,
            loop_mode: opts.loop_mode,
            autoplay: opts.autoplay,
            self_driven: params.self_driven,
            init_frame: opts.init_frame.map(i64::from),
            color: opts.tint.as_ref().and_then(|t| t.resolve(themes)),
            tint: opts.tint.clone(),
            inverse: opts.inverse,
            skip_first_frame: opts.skip_first_frame,
            mode: params.mode,
            targets: params.targets,
            token: token.clone(),
        });
        self.players.insert(id, PlayerKind::Lottie(player));
        if let Some(key) = key {
            self.by_cache_key.insert(key, id);
        }

        let sent = self.pool.load(LoadRequest {
            id,
            payload: params.payload,
            size: scaled,
            tone: opts.tone,
            token,
        });
        if let Err(e) = sent {
            self.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Register a host-fed video player.
    pub(crate) fn add_video(
        &mut self,
        size: PixelSize,
        mode: RenderMode,
        targets: usize,
        options: &PlayerOptions,
    ) -> PlaybackResult<PlayerId> {
        if size.is_empty() {
            return Err(PlaybackError::size("cannot create a video player without a size"));
        }
        let id = self.alloc_id();
        let player = VideoPlayer::new(
            id,
            size,
            mode,
            targets,
            options.loop_mode,
            options.autoplay,
        );
        self.players.insert(id, PlayerKind::Video(player));
        Ok(id)
    }

    /// Apply worker replies and advance every player's frame loop.
    pub(crate) fn pump(&mut self, now: Instant) {
        for round in 0..PUMP_ROUNDS {
            let replies = self.pool.drain();
            if replies.is_empty() && round > 0 {
                break;
            }
            for reply in replies {
                self.dispatch(reply, now);
            }
            self.tick_players(now);
        }
        self.collect_events();
    }

    /// Block up to `timeout` for one worker reply, then pump.
    pub(crate) fn pump_blocking(&mut self, now: Instant, timeout: Duration) {
        if let Some(reply) = self.pool.wait(timeout) {
            self.dispatch(reply, now);
        }
        self.pump(now);
    }

    fn tick_players(&mut self, now: Instant) {
        let mut ctx = PlayerCtx {
            pool: &mut self.pool,
            cache: &mut self.cache,
            storage: self.config.frame_storage,
        };
        for player in self.players.values_mut() {
            if let PlayerKind::Lottie(p) = player {
                p.tick(now, &mut ctx);
            }
        }
    }

    fn dispatch(&mut self, reply: WorkerReply, now: Instant) {
        let id = reply.id();
        let Some(player) = self.players.get_mut(&id).and_then(PlayerKind::as_lottie_mut) else {
            tracing::debug!(%id, "reply for unknown player dropped");
            return;
        };
        let mut ctx = PlayerCtx {
            pool: &mut self.pool,
            cache: &mut self.cache,
            storage: self.config.frame_storage,
        };
        match reply {
            WorkerReply::Loaded {
                frame_count, fps, ..
            } => player.on_load(frame_count, fps, now, &mut ctx),
            WorkerReply::Frame { frame, pixels, .. } => player.on_frame(frame, pixels, now, &mut ctx),
            WorkerReply::Error { reason, .. } => player.on_error(reason),
        }
    }

    fn collect_events(&mut self) {
        for player in self.players.values_mut() {
            self.events.extend(player.playable_mut().take_events());
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<PlayerEvent> {
        self.collect_events();
        std::mem::take(&mut self.events)
    }

    /// Destroy a player, releasing its worker conversation and cache reference. Idempotent.
    pub(crate) fn remove(&mut self, id: PlayerId) {
        let Some(mut player) = self.players.remove(&id) else {
            return;
        };
        match &mut player {
            PlayerKind::Lottie(p) => {
                let mut ctx = PlayerCtx {
                    pool: &mut self.pool,
                    cache: &mut self.cache,
                    storage: self.config.frame_storage,
                };
                p.remove(&mut ctx);
                if let Some(key) = p.cache_key()
                    && self.by_cache_key.get(key) == Some(&id)
                {
                    self.by_cache_key.remove(key);
                }
            }
            PlayerKind::Video(v) => v.remove(),
        }
        self.events.extend(player.playable_mut().take_events());
    }

    fn with_lottie<R>(
        &mut self,
        id: PlayerId,
        f: impl FnOnce(&mut AnimationPlayer, &mut PlayerCtx<'_>) -> R,
    ) -> Option<R> {
        let player = self.players.get_mut(&id)?.as_lottie_mut()?;
        let mut ctx = PlayerCtx {
            pool: &mut self.pool,
            cache: &mut self.cache,
            storage: self.config.frame_storage,
        };
        Some(f(player, &mut ctx))
    }

    fn playable_mut(&mut self, id: PlayerId) -> Option<&mut dyn Playable> {
        self.players.get_mut(&id).map(PlayerKind::playable_mut)
    }

    fn playable(&self, id: PlayerId) -> Option<&dyn Playable> {
        self.players.get(&id).map(PlayerKind::playable)
    }

    pub(crate) fn play(&mut self, id: PlayerId) {
        if let Some(p) = self.playable_mut(id) {
            p.play();
        }
    }

    pub(crate) fn pause(&mut self, id: PlayerId) {
        if let Some(p) = self.playable_mut(id) {
            p.pause(true);
        }
    }

    pub(crate) fn is_paused(&self, id: PlayerId) -> bool {
        self.playable(id).is_none_or(|p| p.is_paused())
    }

    pub(crate) fn autoplay(&self, id: PlayerId) -> bool {
        self.playable(id).is_some_and(|p| p.autoplay())
    }

    pub(crate) fn set_autoplay(&mut self, id: PlayerId, autoplay: bool) {
        if let Some(p) = self.playable_mut(id) {
            p.set_autoplay(autoplay);
        }
    }

    pub(crate) fn state(&self, id: PlayerId) -> Option<PlayerState> {
        self.playable(id).map(|p| p.state())
    }

    pub(crate) fn current_frame(&self, id: PlayerId) -> Option<i64> {
        self.playable(id).map(|p| p.current_frame())
    }

    pub(crate) fn has_painted(&self, id: PlayerId) -> bool {
        self.playable(id).is_some_and(|p| p.has_painted())
    }

    pub(crate) fn loop_mode(&self, id: PlayerId) -> Option<LoopMode> {
        self.playable(id).map(|p| p.loop_mode())
    }

    pub(crate) fn apply_loop_setting(&mut self, id: PlayerId, enabled: bool) -> bool {
        self.playable_mut(id)
            .is_some_and(|p| p.apply_loop_setting(enabled))
    }

    pub(crate) fn set_loop_mode(&mut self, id: PlayerId, mode: LoopMode) {
        self.with_lottie(id, |p, _| p.set_loop_mode(mode));
    }

    pub(crate) fn latest_frame(&self, id: PlayerId) -> Option<Arc<RgbaImage>> {
        self.playable(id).and_then(|p| p.surfaces().latest())
    }

    pub(crate) fn canvas(&self, id: PlayerId, idx: usize) -> Option<&RgbaImage> {
        self.playable(id).and_then(|p| p.surfaces().canvas(idx))
    }

    #[cfg(test)]
    pub(crate) fn render_mode(&self, id: PlayerId) -> Option<RenderMode> {
        self.playable(id).map(|p| p.surfaces().mode())
    }

    /// Switch a player to compositor capture and stop it from driving itself.
    pub(crate) fn capture(&mut self, id: PlayerId) {
        if let Some(p) = self.players.get_mut(&id) {
            p.playable_mut().surfaces_mut().set_mode(RenderMode::Capture);
            if let Some(l) = p.as_lottie_mut() {
                l.set_self_driven(false);
            }
        }
    }

    pub(crate) fn stop(&mut self, id: PlayerId, render_first: bool, now: Instant) {
        self.with_lottie(id, |p, ctx| p.stop(render_first, now, ctx));
    }

    pub(crate) fn restart(&mut self, id: PlayerId, now: Instant) {
        self.with_lottie(id, |p, ctx| p.restart(now, ctx));
    }

    pub(crate) fn seek(&mut self, id: PlayerId, frame: u32, now: Instant) {
        self.with_lottie(id, |p, ctx| p.seek(frame, now, ctx));
    }

    pub(crate) fn set_speed(&mut self, id: PlayerId, speed: f64) {
        self.with_lottie(id, |p, _| p.set_speed(speed));
    }

    pub(crate) fn set_direction(&mut self, id: PlayerId, direction: Direction) {
        self.with_lottie(id, |p, _| p.set_direction(direction));
    }

    pub(crate) fn play_to_frame(
        &mut self,
        id: PlayerId,
        frame: u32,
        direction: Option<Direction>,
        speed: Option<f64>,
        callback: Option<FrameCallback>,
    ) -> PlaybackResult<()> {
        self.with_lottie(id, |p, _| p.play_to_frame(frame, direction, speed, callback))
            .ok_or_else(|| PlaybackError::validation(format!("{id} is not an animation player")))
    }

    pub(crate) fn play_part(
        &mut self,
        id: PlayerId,
        from: u32,
        to: u32,
        callback: Option<FrameCallback>,
    ) -> PlaybackResult<()> {
        self.with_lottie(id, |p, _| p.play_part(from, to, callback))
            .ok_or_else(|| PlaybackError::validation(format!("{id} is not an animation player")))
    }

    pub(crate) fn set_tint(
        &mut self,
        id: PlayerId,
        tint: Option<Tint>,
        themes: &dyn ThemeSource,
        render_if_paused: bool,
    ) {
        if let Some(p) = self.playable_mut(id) {
            p.set_tint(tint, themes, render_if_paused);
        }
    }

    pub(crate) fn set_inverse(&mut self, id: PlayerId, inverse: Option<Rgb>) {
        self.with_lottie(id, |p, _| p.set_inverse(inverse));
    }

    pub(crate) fn refresh_theme(&mut self, themes: &dyn ThemeSource) {
        for p in self.players.values_mut() {
            p.playable_mut().refresh_theme(themes);
        }
    }

    pub(crate) fn clear_cache(&mut self, id: PlayerId) {
        self.with_lottie(id, |p, ctx| p.clear_cache(ctx.cache));
    }

    pub(crate) fn push_video_frame(&mut self, id: PlayerId, frame: RgbaImage) -> PlaybackResult<()> {
        let video = self
            .players
            .get_mut(&id)
            .and_then(PlayerKind::as_video_mut)
            .ok_or_else(|| PlaybackError::validation(format!("{id} is not a video player")))?;
        video.push_frame(frame);
        Ok(())
    }

    pub(crate) fn video_ended(&mut self, id: PlayerId) {
        if let Some(v) = self.players.get_mut(&id).and_then(PlayerKind::as_video_mut) {
            v.on_ended();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/loader.rs"]
mod tests;
