use crate::emoji::registry::RendererRegistry;
use crate::engine::host::Document;
use crate::foundation::core::{ElementId, LoopMode};
use crate::player::loader::PlayerRegistry;
use crate::scheduler::intersector::{AnimationHost, ScheduledItem};

/// Scheduler-facing view over players, occurrences and the document.
///
/// Standalone players map directly onto the player registry; occurrences pause and play through
/// the renderer registry, which aggregates them onto their backing player. Detached registrations
/// are queued for the engine, which disposes the requests behind them.
pub(crate) struct HostView<'a> {
    pub(crate) players: &'a mut PlayerRegistry,
    pub(crate) renderers: &'a mut RendererRegistry,
    pub(crate) doc: &'a dyn Document,
    pub(crate) departed: &'a mut Vec<(ScheduledItem, ElementId)>,
}

impl AnimationHost for HostView<'_> {
    fn is_paused(&self, item: ScheduledItem) -> bool {
        match item {
            ScheduledItem::Player(p) => self.players.is_paused(p),
            ScheduledItem::Occurrence(o) => self.renderers.occurrence_paused(o),
        }
    }

    fn autoplay(&self, item: ScheduledItem) -> bool {
        match item {
            ScheduledItem::Player(p) => self.players.autoplay(p),
            ScheduledItem::Occurrence(o) => self.renderers.occurrence_autoplay(o),
        }
    }

    fn set_autoplay(&mut self, item: ScheduledItem, autoplay: bool) {
        match item {
            ScheduledItem::Player(p) => self.players.set_autoplay(p, autoplay),
            ScheduledItem::Occurrence(o) => self.renderers.set_occurrence_autoplay(o, autoplay),
        }
    }

    fn play(&mut self, item: ScheduledItem) {
        match item {
            ScheduledItem::Player(p) => self.players.play(p),
            ScheduledItem::Occurrence(o) => self.renderers.set_occurrence_paused(o, false, self.players),
        }
    }

    fn pause(&mut self, item: ScheduledItem) {
        match item {
            ScheduledItem::Player(p) => self.players.pause(p),
            ScheduledItem::Occurrence(o) => self.renderers.set_occurrence_paused(o, true, self.players),
        }
    }

    fn detached(&mut self, item: ScheduledItem, element: ElementId) {
        self.departed.push((item, element));
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.doc.is_connected(element)
    }

    fn clear_cache(&mut self, item: ScheduledItem) {
        if let ScheduledItem::Player(p) = item {
            self.players.clear_cache(p);
        }
    }

    fn is_looping(&self, item: ScheduledItem) -> bool {
        match item {
            ScheduledItem::Player(p) => self.players.loop_mode(p).is_some_and(LoopMode::is_looping),
            ScheduledItem::Occurrence(_) => false,
        }
    }

    fn apply_loop_setting(&mut self, item: ScheduledItem, enabled: bool) -> bool {
        match item {
            ScheduledItem::Player(p) => self.players.apply_loop_setting(p, enabled),
            ScheduledItem::Occurrence(_) => false,
        }
    }
}
