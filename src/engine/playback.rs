use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, bounded};
use image::RgbaImage;

use crate::cache::frames::FrameCache;
use crate::emoji::registry::RendererRegistry;
use crate::emoji::renderer::RendererOptions;
use crate::engine::host::{AssetData, AssetKind, Host, Liveness};
use crate::engine::request::{AnimationHandle, AnimationRequest, Rendered, RequestId};
use crate::engine::view::HostView;
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{
    Direction, ElementId, Group, LoopMode, OccurrenceId, PixelSize, PlayerId, RendererId, Rgb,
    Size,
};
use crate::foundation::error::{PlaybackError, PlaybackResult};
use crate::foundation::math::content_id;
use crate::icon::composer::{IconComposer, IconPart, IconSpec, PartRef};
use crate::player::kind::{PlayerEvent, PlayerEventKind, PlayerState, RenderMode};
use crate::player::loader::{LoadParams, PlayerRegistry};
use crate::player::lottie::FrameCallback;
use crate::player::tint::Tint;
use crate::scheduler::intersector::{
    AnimationKind, AnimationScheduler, Registration, ScheduledItem,
};
use crate::worker::decoder::DecoderFactory;
use crate::worker::pool::WorkerStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    /// Nothing to play: waiting for visibility, or a lazy start that failed.
    Idle,
    Static,
    Player(PlayerId),
    Occurrence(OccurrenceId),
}

struct Parked {
    request: AnimationRequest,
    size: PixelSize,
    data: AssetData,
}

struct Record {
    element: ElementId,
    target: Target,
    /// Holds one scheduler registration of `target` on `element`.
    scheduled: bool,
    icon: Option<Arc<str>>,
    liveness: Option<Liveness>,
    reply: Option<Sender<PlaybackResult<Rendered>>>,
    deadline: Option<Instant>,
    parked: Option<Parked>,
}

impl Record {
    fn item(&self) -> Option<ScheduledItem> {
        match self.target {
            Target::Player(p) => Some(ScheduledItem::Player(p)),
            Target::Occurrence(o) => Some(ScheduledItem::Occurrence(o)),
            Target::Idle | Target::Static => None,
        }
    }

    fn resolve(&mut self, outcome: PlaybackResult<Rendered>) {
        if let Some(tx) = self.reply.take() {
            // The requester may have dropped its receiver already.
            let _ = tx.send(outcome);
        }
    }
}

/// Owner of every player, scheduler entry and renderer of one embedding application.
///
/// All state lives here and is mutated through `&mut self` from the host's UI thread; decode work
/// runs on the worker pool. Time is passed in explicitly: call [`Engine::tick`] from the host's
/// frame loop.
pub struct Engine<H: Host> {
    config: EngineConfig,
    host: H,
    players: PlayerRegistry,
    scheduler: AnimationScheduler,
    renderers: RendererRegistry,
    icons: IconComposer,
    requests: BTreeMap<RequestId, Record>,
    next_request: u64,
    events: Vec<PlayerEvent>,
    departed: Vec<(ScheduledItem, ElementId)>,
}

impl<H: Host> Engine<H> {
    /// Validate `config` and spin up the decode pool.
    pub fn new(
        config: EngineConfig,
        host: H,
        factory: Arc<dyn DecoderFactory>,
    ) -> PlaybackResult<Self> {
        config.validate()?;
        let players = PlayerRegistry::new(&config, factory)?;
        let renderers = RendererRegistry::new(
            config.device.animation_pixel_ratio(),
            config.viewport_margin_factor,
            config.compositor_interval(),
        );
        tracing::debug!(workers = config.workers, mode = ?config.worker_mode, "engine started");
        Ok(Self {
            scheduler: AnimationScheduler::new(config.stickers_loop),
            config,
            host,
            players,
            renderers,
            icons: IconComposer::new(),
            requests: BTreeMap::new(),
            next_request: 0,
            events: Vec::new(),
            departed: Vec::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The embedding host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The embedding host, mutably (e.g. to move elements around in a fake document).
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Run a scheduler operation, then dispose the requests whose element it saw leave.
    fn schedule<R>(
        &mut self,
        op: impl FnOnce(&mut AnimationScheduler, &mut HostView<'_>) -> R,
    ) -> R {
        let out = op(
            &mut self.scheduler,
            &mut HostView {
                players: &mut self.players,
                renderers: &mut self.renderers,
                doc: &self.host,
                departed: &mut self.departed,
            },
        );
        for (item, element) in std::mem::take(&mut self.departed) {
            let ids: Vec<RequestId> = self
                .requests
                .iter()
                .filter(|(_, r)| r.scheduled && r.element == element && r.item() == Some(item))
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                tracing::trace!(%id, ?element, "element left the document");
                self.dispose(id);
            }
        }
        out
    }

    /// Attach an animation to an element.
    ///
    /// Fails synchronously with [`PlaybackError::Cancelled`] for a dead requester,
    /// [`PlaybackError::Size`] when no size can be determined, and [`PlaybackError::Validation`]
    /// for unknown assets or icons. Decode failures arrive later through the handle.
    #[tracing::instrument(level = "debug", skip_all, fields(asset = %request.asset, element = request.element.0))]
    pub fn request_animation(
        &mut self,
        request: AnimationRequest,
    ) -> PlaybackResult<AnimationHandle> {
        if request.liveness.as_ref().is_some_and(|l| !l.is_alive()) {
            tracing::trace!("requester gone before start");
            return Err(PlaybackError::Cancelled);
        }
        let data = self.host.fetch(&request.asset).ok_or_else(|| {
            PlaybackError::validation(format!("unknown asset '{}'", request.asset))
        })?;
        if let Some(icon) = &request.icon
            && !self.icons.contains(icon)
        {
            return Err(PlaybackError::validation(format!("unknown icon '{icon}'")));
        }
        let animated = match data.kind {
            AssetKind::Static => false,
            AssetKind::Lottie => data.payload.is_some(),
            AssetKind::Video => true,
        };
        let size = if !animated {
            PixelSize::default()
        } else if let Some(r) = request.shared.and_then(|r| self.renderers.renderer(r)) {
            r.emoji_size()
        } else {
            request
                .size
                .or_else(|| self.host.measured_size(request.element))
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    PlaybackError::size(format!(
                        "'{}' has neither an explicit size nor a measurable container",
                        request.asset
                    ))
                })?
        };

        self.next_request += 1;
        let id = RequestId(self.next_request);
        let (tx, rx) = bounded(1);
        let mut record = Record {
            element: request.element,
            target: Target::Idle,
            scheduled: false,
            icon: request.icon.clone(),
            liveness: request.liveness.clone(),
            reply: Some(tx),
            deadline: None,
            parked: None,
        };

        if !animated {
            record.target = Target::Static;
            record.resolve(Ok(Rendered::Static(data.thumbnail.clone())));
        } else if request.lazy && !self.scheduler.is_element_visible(request.element) {
            tracing::trace!(%id, "parked until visible");
            record.parked = Some(Parked {
                request,
                size,
                data,
            });
        } else {
            record.target = self.start(&request, size, &data)?;
            record.scheduled = request.scheduled;
        }
        tracing::debug!(%id, target = ?record.target, "animation requested");
        self.requests.insert(id, record);
        self.drop_if_detached(id);
        Ok(AnimationHandle { id, render: rx })
    }

    /// A registration the scheduler refused right away: the element was already gone.
    fn drop_if_detached(&mut self, id: RequestId) {
        let detached = self
            .requests
            .get(&id)
            .filter(|r| r.scheduled)
            .and_then(Record::item)
            .is_some_and(|item| !self.scheduler.contains(item));
        if detached {
            tracing::trace!(%id, "element already left the document");
            self.dispose(id);
        }
    }

    fn start(
        &mut self,
        request: &AnimationRequest,
        size: PixelSize,
        data: &AssetData,
    ) -> PlaybackResult<Target> {
        if let Some(renderer) = request.shared
            && self.renderers.renderer(renderer).is_some()
        {
            return self.start_occurrence(renderer, request, data);
        }

        let player = self.spawn(
            request,
            Arc::clone(&request.asset),
            size,
            RenderMode::Canvas,
            data,
        )?;
        if request.scheduled {
            let kind = match data.kind {
                AssetKind::Video => AnimationKind::Video,
                _ => AnimationKind::Lottie,
            };
            let reg = Registration {
                item: ScheduledItem::Player(player),
                group: request.group.clone(),
                element: request.element,
                controlled: request.controlled,
                locked: false,
                kind,
            };
            self.schedule(|scheduler, view| scheduler.add_animation(reg, view));
        } else if data.kind == AssetKind::Video && request.options.autoplay {
            self.players.play(player);
        }
        Ok(Target::Player(player))
    }

    fn spawn(
        &mut self,
        request: &AnimationRequest,
        name: Arc<str>,
        size: PixelSize,
        mode: RenderMode,
        data: &AssetData,
    ) -> PlaybackResult<PlayerId> {
        let targets = match mode {
            RenderMode::Canvas => request.targets.max(1),
            RenderMode::Capture => 1,
        };
        if data.kind == AssetKind::Video {
            return self
                .players
                .add_video(size, mode, targets, &request.options);
        }
        let payload = data.payload.clone().ok_or_else(|| {
            PlaybackError::validation(format!("asset '{}' has no payload", request.asset))
        })?;
        let name = if data.content_addressed {
            Arc::from(content_id(&payload))
        } else {
            name
        };
        self.players.load(
            LoadParams {
                name: Some(name),
                payload,
                size,
                targets,
                mode,
                self_driven: mode == RenderMode::Canvas && !request.scheduled,
                options: &request.options,
            },
            &self.host,
        )
    }

    fn start_occurrence(
        &mut self,
        renderer: RendererId,
        request: &AnimationRequest,
        data: &AssetData,
    ) -> PlaybackResult<Target> {
        let registered = self
            .renderers
            .register(
                renderer,
                request.element,
                Arc::clone(&request.asset),
                request.text_colored,
            )
            .ok_or_else(|| PlaybackError::validation(format!("unknown renderer {renderer:?}")))?;
        let occ = registered.occurrence;
        if registered.needs_load {
            let key = registered.key;
            match self.spawn(
                request,
                Arc::clone(&key.asset),
                key.size,
                RenderMode::Capture,
                data,
            ) {
                Ok(player) => self
                    .renderers
                    .attach_player(&key, player, &mut self.players),
                Err(e) => {
                    self.renderers.unregister(occ, &mut self.players);
                    return Err(e);
                }
            }
        }

        self.renderers
            .set_occurrence_autoplay(occ, request.options.autoplay);
        if request.scheduled {
            let group = self
                .renderers
                .renderer(renderer)
                .map_or_else(|| request.group.clone(), |r| r.group().clone());
            let reg = Registration {
                item: ScheduledItem::Occurrence(occ),
                group,
                element: request.element,
                controlled: request.controlled,
                locked: false,
                kind: AnimationKind::Emoji,
            };
            self.schedule(|scheduler, view| scheduler.add_animation(reg, view));
        } else if request.options.autoplay {
            self.renderers
                .set_occurrence_paused(occ, false, &mut self.players);
        }
        Ok(Target::Occurrence(occ))
    }

    /// Release everything a request owns. Idempotent; safe after the element is gone.
    ///
    /// A player or occurrence shared with other requests survives until the last of them goes.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn dispose(&mut self, id: RequestId) {
        let Some(record) = self.requests.remove(&id) else {
            return;
        };
        let Some(item) = record.item() else {
            return;
        };
        if record.scheduled {
            self.scheduler.release(item, record.element);
        }
        let target = record.target;
        if self.requests.values().any(|r| r.target == target) {
            tracing::trace!(?target, "still used by another request");
            return;
        }
        self.scheduler.forget(item);
        match target {
            Target::Player(p) => self.players.remove(p),
            Target::Occurrence(o) => self.renderers.unregister(o, &mut self.players),
            Target::Idle | Target::Static => {}
        }
        tracing::debug!(?target, "request disposed");
    }

    /// Dispose every request attached to `element`.
    pub fn release_element(&mut self, element: ElementId) {
        let ids: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|(_, r)| r.element == element)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.dispose(id);
        }
    }

    /// One host frame: apply decoded frames, advance players, composite, settle render promises.
    pub fn tick(&mut self, now: Instant) {
        self.players.pump(now);
        self.after_pump(now);
    }

    /// Like [`Engine::tick`], but first waits up to `timeout` for a worker reply.
    pub fn tick_blocking(&mut self, now: Instant, timeout: Duration) {
        self.players.pump_blocking(now, timeout);
        self.after_pump(now);
    }

    fn after_pump(&mut self, now: Instant) {
        let events = self.players.take_events();
        let failed: HashMap<PlayerId, String> = events
            .iter()
            .filter_map(|e| match &e.kind {
                PlayerEventKind::Failed(reason) => Some((e.player, reason.clone())),
                _ => None,
            })
            .collect();
        self.events.extend(events);
        self.unschedule_failed(&failed);
        self.settle(&failed);
        self.renderers
            .tick(now, &self.players, &self.host, &self.host);
        self.expire(now);
        self.reap();
    }

    /// Failed players stay readable but leave the scheduler, with every occurrence they back.
    fn unschedule_failed(&mut self, failed: &HashMap<PlayerId, String>) {
        for &player in failed.keys() {
            self.scheduler.forget(ScheduledItem::Player(player));
            for occ in self.renderers.occurrences_backed_by(player) {
                self.scheduler.forget(ScheduledItem::Occurrence(occ));
            }
            tracing::debug!(%player, "failed player unscheduled");
        }
    }

    fn settle(&mut self, failed: &HashMap<PlayerId, String>) {
        for (id, record) in &mut self.requests {
            if record.reply.is_none() {
                continue;
            }
            let player = match record.target {
                Target::Player(p) => Some(p),
                Target::Occurrence(o) => self.renderers.occurrence_player(o),
                Target::Idle | Target::Static => continue,
            };
            let Some(player) = player else {
                record.reply = None;
                tracing::trace!(%id, "render dropped: occurrence gone");
                continue;
            };
            match self.players.state(player) {
                None | Some(PlayerState::Destroyed) => {
                    record.reply = None;
                    tracing::trace!(%id, "render dropped: player gone");
                }
                Some(PlayerState::Failed) => {
                    let reason = failed
                        .get(&player)
                        .cloned()
                        .unwrap_or_else(|| format!("{player} failed to decode"));
                    record.resolve(Err(PlaybackError::decode(reason)));
                }
                Some(_) if self.players.has_painted(player) => {
                    record.resolve(Ok(Rendered::FirstFrame));
                }
                Some(_) => {}
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        let timeout = self.config.first_frame_timeout();
        for (id, record) in &mut self.requests {
            if record.reply.is_none()
                || !matches!(record.target, Target::Player(_) | Target::Occurrence(_))
            {
                continue;
            }
            let deadline = *record.deadline.get_or_insert(now + timeout);
            if now >= deadline {
                tracing::trace!(%id, "first frame timed out");
                record.resolve(Ok(Rendered::TimedOut));
            }
        }
    }

    fn reap(&mut self) {
        let dead: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|(_, r)| r.liveness.as_ref().is_some_and(|l| !l.is_alive()))
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            tracing::trace!(%id, "requester gone");
            self.dispose(id);
        }
    }

    /// Player events collected since the last call.
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    // Scheduling.

    /// Visibility callback from the host's viewport observer.
    ///
    /// Becoming visible also starts lazy requests parked on `element`.
    pub fn set_visible(&mut self, element: ElementId, visible: bool) {
        if visible {
            self.start_parked(element);
        }
        self.schedule(|scheduler, view| scheduler.set_visibility(element, visible, view));
    }

    fn start_parked(&mut self, element: ElementId) {
        let ids: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|(_, r)| r.element == element && r.parked.is_some())
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            let Some(parked) = self.requests.get_mut(&id).and_then(|r| r.parked.take()) else {
                continue;
            };
            let outcome = self.start(&parked.request, parked.size, &parked.data);
            let Some(record) = self.requests.get_mut(&id) else {
                continue;
            };
            match outcome {
                Ok(target) => {
                    tracing::trace!(%id, ?target, "lazy request started");
                    record.target = target;
                    record.scheduled = parked.request.scheduled;
                    self.drop_if_detached(id);
                }
                Err(e) => record.resolve(Err(e)),
            }
        }
    }

    /// Re-check every entry, e.g. after the document changed. Disconnected entries are removed.
    pub fn check_animations(&mut self) {
        self.schedule(|scheduler, view| {
            scheduler.check_animations(false, None, false, false, view);
        });
    }

    /// Caller intent to play; takes effect once the scheduler admits the animation.
    pub fn play(&mut self, id: RequestId) {
        if let Some(item) = self.item(id) {
            self.schedule(|scheduler, view| scheduler.request_play(item, view));
        }
    }

    /// Caller intent to pause.
    pub fn pause(&mut self, id: RequestId) {
        if let Some(item) = self.item(id) {
            self.schedule(|scheduler, view| scheduler.request_pause(item, view));
        }
    }

    /// Exempt one request from every scheduler check, or subject it again.
    pub fn set_locked(&mut self, id: RequestId, locked: bool) {
        if let Some(item) = self.item(id) {
            self.scheduler.toggle_item_lock(item, locked);
        }
    }

    /// Force `group` to pause (`idle = true`), or release it.
    pub fn set_override_idle_group(&mut self, group: &Group, idle: bool) {
        self.schedule(|scheduler, view| scheduler.set_override_idle_group(group, idle, view));
    }

    /// Only `group` may play; `None` lifts the restriction.
    pub fn set_only_one_playable_group(&mut self, group: Option<Group>) {
        self.schedule(|scheduler, view| scheduler.set_only_one_playable_group(group, view));
    }

    /// Group whose entries survive leaving the document.
    pub fn lock_group(&mut self, group: Group) {
        self.scheduler.lock_group(group);
    }

    /// Undo [`Engine::lock_group`].
    pub fn unlock_group(&mut self, group: &Group) {
        self.schedule(|scheduler, view| scheduler.unlock_group(group, view));
    }

    /// Freeze or resume visibility tracking of `group`.
    pub fn toggle_intersection_group(&mut self, group: &Group, lock: bool) {
        self.schedule(|scheduler, view| scheduler.toggle_intersection_group(group, lock, view));
    }

    /// Application idle state; idle pauses everything outside frozen groups.
    pub fn set_app_idle(&mut self, idle: bool) {
        self.schedule(|scheduler, view| scheduler.set_app_idle(idle, view));
    }

    /// Pause every video while `locked`.
    pub fn set_videos_locked(&mut self, locked: bool) {
        self.schedule(|scheduler, view| scheduler.set_videos_locked(locked, view));
    }

    /// Global "loop stickers" setting. Returns `true` when any animation changed.
    pub fn set_stickers_loop(&mut self, enabled: bool) -> bool {
        self.config.stickers_loop = enabled;
        self.schedule(|scheduler, view| scheduler.set_loop(enabled, view))
    }

    /// Theme colors changed: re-resolve every theme tint without decoding again.
    pub fn theme_changed(&mut self) {
        self.players.refresh_theme(&self.host);
    }

    // Synchronized renderers.

    /// Create a compositor canvas for inline occurrences.
    pub fn create_renderer(&mut self, options: RendererOptions) -> RendererId {
        self.renderers.create_renderer(options)
    }

    /// Destroy a renderer, disposing every request drawn by it.
    pub fn destroy_renderer(&mut self, renderer: RendererId) {
        let occs: HashSet<OccurrenceId> = self
            .renderers
            .renderer(renderer)
            .map(|r| r.all_occurrences().into_iter().collect())
            .unwrap_or_default();
        let ids: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|(_, r)| matches!(r.target, Target::Occurrence(o) if occs.contains(&o)))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.dispose(id);
        }
        self.renderers.destroy_renderer(renderer, &mut self.players);
    }

    /// Container of `renderer` was resized.
    pub fn resize_renderer(&mut self, renderer: RendererId, size: Size) {
        self.renderers
            .set_renderer_dimensions(renderer, size, &self.players, &self.host, &self.host);
    }

    /// Redraw `renderer` now, outside the compositor throttle.
    pub fn force_render(&mut self, renderer: RendererId) {
        self.renderers
            .force_render(renderer, &self.players, &self.host, &self.host);
    }

    /// Compositor canvas of `renderer`.
    pub fn renderer_canvas(&self, renderer: RendererId) -> Option<&RgbaImage> {
        self.renderers.renderer(renderer).map(|r| r.canvas())
    }

    /// Distinct decode streams backing synchronized renderers.
    pub fn synced_players(&self) -> usize {
        self.renderers.synced_players()
    }

    // Compound icons.

    /// Register a compound icon.
    pub fn add_icon(&mut self, spec: IconSpec) -> PlaybackResult<()> {
        self.icons.add(spec)
    }

    /// Look up a part of a registered icon.
    pub fn icon_part(&self, icon: &str, part: PartRef<'_>) -> Option<&IconPart> {
        self.icons.get_part(icon, part)
    }

    /// Play the icon transition from `prev` into `state`.
    pub fn set_icon_state(
        &mut self,
        id: RequestId,
        state: &str,
        prev: Option<&str>,
    ) -> PlaybackResult<IconPart> {
        let record = self.record(id)?;
        let icon = record
            .icon
            .clone()
            .ok_or_else(|| PlaybackError::validation(format!("{id} is not an icon request")))?;
        let player = self.player_of(id)?;
        self.icons
            .set_state(&icon, player, state, prev, &mut self.players, &self.host)
    }

    // Direct player control.

    fn record(&self, id: RequestId) -> PlaybackResult<&Record> {
        self.requests
            .get(&id)
            .ok_or_else(|| PlaybackError::validation(format!("unknown {id}")))
    }

    fn player_of(&self, id: RequestId) -> PlaybackResult<PlayerId> {
        self.player(id)
            .ok_or_else(|| PlaybackError::validation(format!("{id} has no player")))
    }

    fn item(&self, id: RequestId) -> Option<ScheduledItem> {
        self.requests.get(&id)?.item()
    }

    /// Run from the current frame to `frame` once, then pause; `callback` fires on arrival.
    pub fn play_to_frame(
        &mut self,
        id: RequestId,
        frame: u32,
        direction: Option<Direction>,
        speed: Option<f64>,
        callback: Option<FrameCallback>,
    ) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players
            .play_to_frame(player, frame, direction, speed, callback)
    }

    /// Play `from..=to` once.
    pub fn play_part(
        &mut self,
        id: RequestId,
        from: u32,
        to: u32,
        callback: Option<FrameCallback>,
    ) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.play_part(player, from, to, callback)
    }

    /// Jump to `frame` and paint it.
    pub fn seek(&mut self, id: RequestId, frame: u32, now: Instant) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.seek(player, frame, now);
        Ok(())
    }

    /// Pause and rewind.
    pub fn stop(&mut self, id: RequestId, now: Instant) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.stop(player, true, now);
        Ok(())
    }

    /// Rewind and play.
    pub fn restart(&mut self, id: RequestId, now: Instant) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.restart(player, now);
        Ok(())
    }

    /// Playback speed multiplier.
    pub fn set_speed(&mut self, id: RequestId, speed: f64) -> PlaybackResult<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(PlaybackError::validation("speed must be finite and > 0"));
        }
        let player = self.player_of(id)?;
        self.players.set_speed(player, speed);
        Ok(())
    }

    /// Playback direction.
    pub fn set_direction(&mut self, id: RequestId, direction: Direction) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.set_direction(player, direction);
        Ok(())
    }

    /// Loop behavior.
    pub fn set_loop_mode(&mut self, id: RequestId, mode: LoopMode) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.set_loop_mode(player, mode);
        Ok(())
    }

    /// Replace the tint; a paused player repaints its current frame.
    pub fn set_tint(&mut self, id: RequestId, tint: Option<Tint>) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.set_tint(player, tint, &self.host, true);
        Ok(())
    }

    /// Replace the inverse color.
    pub fn set_inverse(&mut self, id: RequestId, inverse: Option<Rgb>) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.set_inverse(player, inverse);
        Ok(())
    }

    /// Hand the next decoded video frame to a video request.
    pub fn push_video_frame(&mut self, id: RequestId, frame: RgbaImage) -> PlaybackResult<()> {
        let player = self.player_of(id)?;
        self.players.push_video_frame(player, frame)
    }

    /// The host's video stream ended.
    pub fn video_ended(&mut self, id: RequestId) {
        if let Some(player) = self.player(id) {
            self.players.video_ended(player);
        }
    }

    // Queries.

    /// Player painting for `id`; the backing player for shared occurrences.
    pub fn player(&self, id: RequestId) -> Option<PlayerId> {
        match self.requests.get(&id)?.target {
            Target::Player(p) => Some(p),
            Target::Occurrence(o) => self.renderers.occurrence_player(o),
            Target::Idle | Target::Static => None,
        }
    }

    /// Occurrence registered for a shared request.
    pub fn occurrence(&self, id: RequestId) -> Option<OccurrenceId> {
        match self.requests.get(&id)?.target {
            Target::Occurrence(o) => Some(o),
            _ => None,
        }
    }

    /// Lifecycle state of the request's player.
    pub fn state(&self, id: RequestId) -> Option<PlayerState> {
        self.player(id).and_then(|p| self.players.state(p))
    }

    /// Whether the request is currently held still. Occurrences report their own flag.
    pub fn is_paused(&self, id: RequestId) -> bool {
        match self.requests.get(&id).map(|r| r.target) {
            Some(Target::Player(p)) => self.players.is_paused(p),
            Some(Target::Occurrence(o)) => self.renderers.occurrence_paused(o),
            _ => true,
        }
    }

    /// Current frame of the request's player.
    pub fn current_frame(&self, id: RequestId) -> Option<i64> {
        self.player(id).and_then(|p| self.players.current_frame(p))
    }

    /// Canvas `idx` of a standalone request.
    pub fn canvas(&self, id: RequestId, idx: usize) -> Option<&RgbaImage> {
        self.player(id).and_then(|p| self.players.canvas(p, idx))
    }

    /// Latest captured frame of a shared request's backing player.
    pub fn latest_frame(&self, id: RequestId) -> Option<Arc<RgbaImage>> {
        self.player(id).and_then(|p| self.players.latest_frame(p))
    }

    /// Whether the request is registered with the visibility scheduler.
    pub fn is_scheduled(&self, id: RequestId) -> bool {
        self.item(id).is_some_and(|item| self.scheduler.contains(item))
    }

    /// Requests not yet disposed.
    pub fn live_requests(&self) -> usize {
        self.requests.len()
    }

    /// Live players, standalone and backing.
    pub fn live_players(&self) -> usize {
        self.players.len()
    }

    /// Entries registered with the visibility scheduler.
    pub fn scheduled_animations(&self) -> usize {
        self.scheduler.len()
    }

    /// Decode pool counters.
    pub fn worker_stats(&self) -> WorkerStats {
        self.players.stats()
    }

    /// Shared frame cache.
    pub fn frame_cache(&self) -> &FrameCache {
        self.players.cache()
    }
}
