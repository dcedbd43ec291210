use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::emoji::renderer::{EmojiRenderer, RendererOptions};
use crate::emoji::viewport::{Offset, offsets_from, viewport_slice};
use crate::engine::host::Document;
use crate::foundation::core::{ElementId, OccurrenceId, PixelSize, PlayerId, RendererId, Size};
use crate::player::loader::PlayerRegistry;
use crate::player::tint::ThemeSource;

/// Identity shared by every occurrence that can reuse one decode stream.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SyncKey {
    pub(crate) asset: Arc<str>,
    pub(crate) size: PixelSize,
    pub(crate) tint: Option<Arc<str>>,
}

#[derive(Clone, Debug)]
struct Occurrence {
    element: ElementId,
    renderer: RendererId,
    key: SyncKey,
    paused: bool,
    autoplay: bool,
}

#[derive(Debug)]
struct SyncedPlayer {
    player: Option<PlayerId>,
    occurrences: BTreeSet<OccurrenceId>,
    paused: BTreeSet<OccurrenceId>,
}

/// Result of registering an occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Registered {
    pub(crate) occurrence: OccurrenceId,
    pub(crate) key: SyncKey,
    /// No backing player exists yet; the caller must load one and attach it.
    pub(crate) needs_load: bool,
}

/// All synchronized renderers, their occurrences and the synced players backing them.
///
/// Occurrences point back at their renderer by id only; the renderer owns the registration.
pub(crate) struct RendererRegistry {
    renderers: BTreeMap<RendererId, EmojiRenderer>,
    synced: HashMap<SyncKey, SyncedPlayer>,
    occurrences: HashMap<OccurrenceId, Occurrence>,
    next_renderer: u64,
    next_occurrence: u64,
    dpr: f64,
    margin_factor: f64,
    interval: Duration,
    armed: bool,
    last_render: Option<Instant>,
}

impl RendererRegistry {
    pub(crate) fn new(dpr: f64, margin_factor: f64, interval: Duration) -> Self {
        Self {
            renderers: BTreeMap::new(),
            synced: HashMap::new(),
            occurrences: HashMap::new(),
            next_renderer: 0,
            next_occurrence: 0,
            dpr,
            margin_factor,
            interval,
            armed: false,
            last_render: None,
        }
    }

    pub(crate) fn create_renderer(&mut self, options: RendererOptions) -> RendererId {
        self.next_renderer += 1;
        let id = RendererId(self.next_renderer);
        self.renderers
            .insert(id, EmojiRenderer::new(id, options, self.dpr));
        id
    }

    pub(crate) fn renderer(&self, id: RendererId) -> Option<&EmojiRenderer> {
        self.renderers.get(&id)
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.armed
    }

    pub(crate) fn synced_players(&self) -> usize {
        self.synced.len()
    }

    pub(crate) fn backing_player(&self, key: &SyncKey) -> Option<PlayerId> {
        self.synced.get(key).and_then(|s| s.player)
    }

    pub(crate) fn occurrence_player(&self, occ: OccurrenceId) -> Option<PlayerId> {
        let o = self.occurrences.get(&occ)?;
        self.backing_player(&o.key)
    }

    /// Occurrences drawn from `player`'s frames.
    pub(crate) fn occurrences_backed_by(&self, player: PlayerId) -> Vec<OccurrenceId> {
        self.synced
            .values()
            .filter(|s| s.player == Some(player))
            .flat_map(|s| s.occurrences.iter().copied())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn contains_occurrence(&self, occ: OccurrenceId) -> bool {
        self.occurrences.contains_key(&occ)
    }

    /// Add an occurrence of `asset` rendered by `renderer`. Idempotent per element.
    pub(crate) fn register(
        &mut self,
        renderer: RendererId,
        element: ElementId,
        asset: Arc<str>,
        text_colored: bool,
    ) -> Option<Registered> {
        let r = self.renderers.get_mut(&renderer)?;
        let key = SyncKey {
            asset,
            size: r.emoji_size(),
            tint: None,
        };
        if let Some((&occurrence, _)) = self
            .occurrences
            .iter()
            .find(|(_, o)| o.renderer == renderer && o.element == element && o.key == key)
        {
            return Some(Registered {
                occurrence,
                key,
                needs_load: false,
            });
        }

        self.next_occurrence += 1;
        let occurrence = OccurrenceId(self.next_occurrence);
        r.insert(key.clone(), occurrence, text_colored);
        self.occurrences.insert(
            occurrence,
            Occurrence {
                element,
                renderer,
                key: key.clone(),
                paused: true,
                autoplay: true,
            },
        );
        let synced = self.synced.entry(key.clone()).or_insert_with(|| SyncedPlayer {
            player: None,
            occurrences: BTreeSet::new(),
            paused: BTreeSet::new(),
        });
        let needs_load = synced.player.is_none() && synced.occurrences.is_empty();
        synced.occurrences.insert(occurrence);
        synced.paused.insert(occurrence);
        Some(Registered {
            occurrence,
            key,
            needs_load,
        })
    }

    /// Attach a freshly loaded player as the backing player of `key`.
    pub(crate) fn attach_player(
        &mut self,
        key: &SyncKey,
        player: PlayerId,
        players: &mut PlayerRegistry,
    ) {
        let Some(synced) = self.synced.get_mut(key) else {
            players.remove(player);
            return;
        };
        synced.player = Some(player);
        players.capture(player);
        tracing::debug!(asset = %key.asset, %player, occurrences = synced.occurrences.len(), "synced player attached");
        self.aggregate(key, players);
        self.armed = true;
    }

    /// Paused iff every occurrence is paused.
    fn aggregate(&self, key: &SyncKey, players: &mut PlayerRegistry) {
        let Some(synced) = self.synced.get(key) else {
            return;
        };
        let Some(player) = synced.player else {
            return;
        };
        let all_paused = synced.paused.len() == synced.occurrences.len();
        if all_paused {
            if !players.is_paused(player) {
                players.pause(player);
            }
        } else if players.is_paused(player) {
            players.play(player);
        }
    }

    pub(crate) fn occurrence_paused(&self, occ: OccurrenceId) -> bool {
        self.occurrences.get(&occ).is_none_or(|o| o.paused)
    }

    pub(crate) fn occurrence_autoplay(&self, occ: OccurrenceId) -> bool {
        self.occurrences.get(&occ).is_some_and(|o| o.autoplay)
    }

    pub(crate) fn set_occurrence_autoplay(&mut self, occ: OccurrenceId, autoplay: bool) {
        if let Some(o) = self.occurrences.get_mut(&occ) {
            o.autoplay = autoplay;
        }
    }

    pub(crate) fn set_occurrence_paused(
        &mut self,
        occ: OccurrenceId,
        paused: bool,
        players: &mut PlayerRegistry,
    ) {
        let Some(o) = self.occurrences.get_mut(&occ) else {
            return;
        };
        if o.paused == paused {
            return;
        }
        o.paused = paused;
        let key = o.key.clone();
        if let Some(synced) = self.synced.get_mut(&key) {
            if paused {
                synced.paused.insert(occ);
            } else {
                synced.paused.remove(&occ);
            }
        }
        self.aggregate(&key, players);
    }

    /// Remove an occurrence; the last one out tears the backing player down.
    pub(crate) fn unregister(&mut self, occ: OccurrenceId, players: &mut PlayerRegistry) {
        let Some(o) = self.occurrences.remove(&occ) else {
            return;
        };
        if let Some(r) = self.renderers.get_mut(&o.renderer) {
            r.remove(&o.key, occ);
        }
        let Some(synced) = self.synced.get_mut(&o.key) else {
            return;
        };
        synced.occurrences.remove(&occ);
        synced.paused.remove(&occ);
        if !synced.occurrences.is_empty() {
            self.aggregate(&o.key, players);
            return;
        }
        if let Some(synced) = self.synced.remove(&o.key)
            && let Some(player) = synced.player
        {
            players.remove(player);
        }
        tracing::debug!(asset = %o.key.asset, "synced player torn down");
        if self.synced.is_empty() {
            self.armed = false;
            self.last_render = None;
        }
    }

    /// Destroy a renderer and every occurrence it owns; returns the removed occurrences.
    pub(crate) fn destroy_renderer(
        &mut self,
        id: RendererId,
        players: &mut PlayerRegistry,
    ) -> Vec<OccurrenceId> {
        let Some(r) = self.renderers.get(&id) else {
            return Vec::new();
        };
        let occs = r.all_occurrences();
        for &occ in &occs {
            self.unregister(occ, players);
        }
        self.renderers.remove(&id);
        occs
    }

    /// Container resize: reset the backing store and redraw right away.
    pub(crate) fn set_renderer_dimensions(
        &mut self,
        id: RendererId,
        size: Size,
        players: &PlayerRegistry,
        doc: &dyn Document,
        themes: &dyn ThemeSource,
    ) {
        let changed = self
            .renderers
            .get_mut(&id)
            .is_some_and(|r| r.set_dimensions(Some(size)));
        if changed {
            self.force_render(id, players, doc, themes);
        }
    }

    /// Render one renderer now; clears it when nothing could be drawn.
    pub(crate) fn force_render(
        &mut self,
        id: RendererId,
        players: &PlayerRegistry,
        doc: &dyn Document,
        themes: &dyn ThemeSource,
    ) {
        if !self.renderers.get(&id).is_some_and(EmojiRenderer::dimensions_set) {
            return;
        }
        if !self.render(Some(id), players, doc, themes)
            && let Some(r) = self.renderers.get_mut(&id)
        {
            r.clear();
        }
    }

    /// Compositor tick, throttled to the configured rate.
    pub(crate) fn tick(
        &mut self,
        now: Instant,
        players: &PlayerRegistry,
        doc: &dyn Document,
        themes: &dyn ThemeSource,
    ) -> bool {
        if !self.armed {
            return false;
        }
        if self
            .last_render
            .is_some_and(|last| now.saturating_duration_since(last) < self.interval)
        {
            return false;
        }
        self.last_render = Some(now);
        self.render(None, players, doc, themes)
    }

    fn has_any_frame(&self, r: &EmojiRenderer, players: &PlayerRegistry) -> bool {
        r.keys()
            .filter_map(|(key, _)| self.backing_player(key))
            .any(|p| players.latest_frame(p).is_some())
    }

    fn all_paused(&self, r: &EmojiRenderer, players: &PlayerRegistry) -> bool {
        r.keys()
            .filter_map(|(key, _)| self.backing_player(key))
            .all(|p| players.is_paused(p))
    }

    /// Redraw `only` or every renderer. Returns `false` when no renderer had anything to show.
    fn render(
        &mut self,
        only: Option<RendererId>,
        players: &PlayerRegistry,
        doc: &dyn Document,
        themes: &dyn ThemeSource,
    ) -> bool {
        let candidates: Vec<RendererId> = self
            .renderers
            .values()
            .filter(|r| only.is_none_or(|id| id == r.id()))
            .filter(|r| doc.is_connected(r.element()) && self.has_any_frame(r, players))
            .map(EmojiRenderer::id)
            .collect();
        if candidates.is_empty() {
            return false;
        }

        let mut jobs = Vec::new();
        for id in candidates {
            let Some(r) = self.renderers.get(&id) else {
                continue;
            };
            if self.all_paused(r, players) {
                continue;
            }
            let batches = self.offsets(r, players, doc);
            if !batches.is_empty() {
                jobs.push((id, batches));
            }
        }

        for (id, _) in &jobs {
            if let Some(r) = self.renderers.get_mut(id) {
                r.clear();
            }
        }
        for (id, batches) in jobs {
            let Some(r) = self.renderers.get_mut(&id) else {
                continue;
            };
            let color = r.text_color().and_then(|t| t.resolve(themes));
            for (key, player, offsets) in batches {
                let Some(frame) = players.latest_frame(player) else {
                    continue;
                };
                let tint = color.filter(|_| r.is_text_colored(&key));
                r.draw(&frame, &offsets, tint);
            }
        }
        true
    }

    /// Visible occurrence offsets per backed asset of `r`.
    fn offsets(
        &self,
        r: &EmojiRenderer,
        players: &PlayerRegistry,
        doc: &dyn Document,
    ) -> Vec<(SyncKey, PlayerId, Vec<Offset>)> {
        let Some(origin) = doc.bounding_rect(r.element()) else {
            return Vec::new();
        };
        // Without a scrollable ancestor the canvas itself bounds what can be seen.
        let overflow = doc
            .scroll_container(r.element())
            .and_then(|e| doc.bounding_rect(e))
            .unwrap_or(origin);
        let extra = f64::from(r.emoji_size().height) * self.margin_factor;

        let mut out = Vec::new();
        for (key, occs) in r.keys() {
            let Some(player) = self.backing_player(key) else {
                continue;
            };
            if players.latest_frame(player).is_none() {
                continue;
            }
            let boxes = occs.iter().filter_map(|occ| {
                let element = self.occurrences.get(occ)?.element;
                Some((*occ, doc.bounding_rect(element)?))
            });
            let visible = viewport_slice(overflow, boxes, extra);
            let offsets = offsets_from(origin, &visible);
            if !offsets.is_empty() {
                out.push((key.clone(), player, offsets));
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/emoji/registry.rs"]
mod tests;
