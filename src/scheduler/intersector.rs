use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::foundation::core::{ElementId, Group, OccurrenceId, PlayerId};

/// Something the scheduler can pause and resume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum ScheduledItem {
    /// A standalone player.
    Player(PlayerId),
    /// One occurrence inside a synchronized renderer.
    Occurrence(OccurrenceId),
}

/// Kind of a scheduled animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// Worker-decoded vector animation.
    #[default]
    Lottie,
    /// Host-decoded video.
    Video,
    /// Inline emoji occurrence.
    Emoji,
}

/// Operations the scheduler performs on registered items.
pub(crate) trait AnimationHost {
    fn is_paused(&self, item: ScheduledItem) -> bool;
    fn autoplay(&self, item: ScheduledItem) -> bool;
    fn set_autoplay(&mut self, item: ScheduledItem, autoplay: bool);
    fn play(&mut self, item: ScheduledItem);
    fn pause(&mut self, item: ScheduledItem);
    /// The registration of `item` on `element` ended for good; release whatever it kept alive.
    fn detached(&mut self, item: ScheduledItem, element: ElementId);
    /// Whether the element is still part of the document.
    fn is_connected(&self, element: ElementId) -> bool;
    fn clear_cache(&mut self, item: ScheduledItem);
    fn is_looping(&self, item: ScheduledItem) -> bool;
    fn apply_loop_setting(&mut self, item: ScheduledItem, enabled: bool) -> bool;
}

/// Registration parameters.
#[derive(Clone, Debug)]
pub(crate) struct Registration {
    pub(crate) item: ScheduledItem,
    pub(crate) group: Group,
    pub(crate) element: ElementId,
    /// Owned by someone else: deregistered on disconnect, never detached by the scheduler.
    pub(crate) controlled: bool,
    pub(crate) locked: bool,
    pub(crate) kind: AnimationKind,
}

/// One element an item is shown on. `refs` counts the registrations sharing it.
#[derive(Clone, Debug)]
struct Entry {
    item: ScheduledItem,
    element: ElementId,
    refs: usize,
    controlled: bool,
    kind: AnimationKind,
}

/// Decides which registered animations may run.
///
/// Visibility is the admission gate; group overrides (idle groups, the only-one-playable group,
/// app idle) always win over it. Ineligible items are paused, never destroyed, so they resume from
/// their current frame. One item may be shown on several elements; it counts as visible while any
/// of them is, and each element's registration ends on its own when that element leaves the
/// document.
#[derive(Debug, Default)]
pub(crate) struct AnimationScheduler {
    by_group: BTreeMap<Group, Vec<Entry>>,
    by_item: HashMap<ScheduledItem, Group>,
    visible: HashSet<(ScheduledItem, ElementId)>,
    visible_elements: HashSet<ElementId>,
    locked_items: HashSet<ScheduledItem>,
    idle_groups: HashSet<Group>,
    only_one: Option<Group>,
    locked_groups: HashSet<Group>,
    intersection_locked: HashSet<Group>,
    videos_locked: bool,
    app_idle: bool,
    stickers_loop: bool,
}

impl AnimationScheduler {
    pub(crate) fn new(stickers_loop: bool) -> Self {
        Self {
            stickers_loop,
            ..Self::default()
        }
    }

    pub(crate) fn contains(&self, item: ScheduledItem) -> bool {
        self.by_item.contains_key(&item)
    }

    /// Registered items, however many elements each is shown on.
    pub(crate) fn len(&self) -> usize {
        self.by_item.len()
    }

    pub(crate) fn is_visible(&self, item: ScheduledItem) -> bool {
        self.visible.iter().any(|(i, _)| *i == item)
    }

    pub(crate) fn is_element_visible(&self, element: ElementId) -> bool {
        self.visible_elements.contains(&element)
    }

    #[cfg(test)]
    pub(crate) fn elements_of(&self, item: ScheduledItem) -> Vec<ElementId> {
        self.entries_of(item).into_iter().map(|e| e.element).collect()
    }

    fn entries_of(&self, item: ScheduledItem) -> Vec<Entry> {
        self.by_item
            .get(&item)
            .and_then(|group| self.by_group.get(group))
            .map(|entries| entries.iter().filter(|e| e.item == item).cloned().collect())
            .unwrap_or_default()
    }

    /// Register an item on an element.
    ///
    /// Registering the same item on the same element again only bumps its count. A second element
    /// joins the group of the first registration.
    pub(crate) fn add_animation(&mut self, reg: Registration, host: &mut dyn AnimationHost) {
        let item = reg.item;
        let element = reg.element;
        let group = match self.by_item.get(&item) {
            Some(group) => {
                if *group != reg.group {
                    tracing::trace!(?item, %group, requested = %reg.group, "keeping first group");
                }
                group.clone()
            }
            None => {
                if reg.kind == AnimationKind::Lottie
                    && !self.stickers_loop
                    && host.is_looping(item)
                {
                    host.apply_loop_setting(item, false);
                }
                self.by_item.insert(item, reg.group.clone());
                reg.group.clone()
            }
        };
        if reg.locked {
            self.locked_items.insert(item);
        }
        let entries = self.by_group.entry(group.clone()).or_default();
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.item == item && e.element == element)
        {
            entry.refs += 1;
            return;
        }
        entries.push(Entry {
            item,
            element,
            refs: 1,
            controlled: reg.controlled,
            kind: reg.kind,
        });
        tracing::trace!(?item, ?element, %group, "scheduler add");

        if self.visible_elements.contains(&element) && !self.intersection_locked.contains(&group) {
            self.visible.insert((item, element));
        }
        self.check_animation(item, false, false, host);
    }

    /// Drop one registration of `item` on `element`. The item leaves the scheduler with its last
    /// registration; nothing is torn down here.
    pub(crate) fn release(&mut self, item: ScheduledItem, element: ElementId) {
        let Some(group) = self.by_item.get(&item).cloned() else {
            return;
        };
        let Some(entries) = self.by_group.get_mut(&group) else {
            return;
        };
        let Some(pos) = entries
            .iter()
            .position(|e| e.item == item && e.element == element)
        else {
            return;
        };
        entries[pos].refs -= 1;
        if entries[pos].refs == 0 {
            self.drop_entry(item, element);
        }
        tracing::trace!(?item, ?element, %group, "scheduler release");
    }

    /// Drop every registration of `item` at once.
    pub(crate) fn forget(&mut self, item: ScheduledItem) {
        let Some(group) = self.by_item.remove(&item) else {
            return;
        };
        if let Some(entries) = self.by_group.get_mut(&group) {
            entries.retain(|e| e.item != item);
            if entries.is_empty() {
                self.by_group.remove(&group);
            }
        }
        self.visible.retain(|(i, _)| *i != item);
        self.locked_items.remove(&item);
        tracing::trace!(?item, %group, "scheduler forget");
    }

    fn drop_entry(&mut self, item: ScheduledItem, element: ElementId) {
        let Some(group) = self.by_item.get(&item).cloned() else {
            return;
        };
        let mut last = true;
        if let Some(entries) = self.by_group.get_mut(&group) {
            entries.retain(|e| !(e.item == item && e.element == element));
            last = !entries.iter().any(|e| e.item == item);
            if entries.is_empty() {
                self.by_group.remove(&group);
            }
        }
        self.visible.remove(&(item, element));
        if last {
            self.by_item.remove(&item);
            self.locked_items.remove(&item);
        }
    }

    /// Visibility callback for `element`. Intersection-locked groups ignore it.
    pub(crate) fn set_visibility(
        &mut self,
        element: ElementId,
        visible: bool,
        host: &mut dyn AnimationHost,
    ) {
        if visible {
            self.visible_elements.insert(element);
        } else {
            self.visible_elements.remove(&element);
        }
        let items: Vec<_> = self
            .by_group
            .iter()
            .filter(|(group, _)| !self.intersection_locked.contains(*group))
            .flat_map(|(_, entries)| entries.iter())
            .filter(|e| e.element == element)
            .map(|e| (e.item, e.kind))
            .collect();
        for (item, kind) in items {
            self.apply_visibility(item, element, kind, visible, host);
        }
    }

    fn apply_visibility(
        &mut self,
        item: ScheduledItem,
        element: ElementId,
        kind: AnimationKind,
        visible: bool,
        host: &mut dyn AnimationHost,
    ) {
        if visible {
            self.visible.insert((item, element));
            self.check_animation(item, false, false, host);
            return;
        }
        self.visible.remove(&(item, element));
        if self.is_visible(item) {
            return;
        }
        self.check_animation(item, true, false, host);
        if kind == AnimationKind::Lottie && self.contains(item) {
            host.clear_cache(item);
        }
    }

    /// Re-evaluate one item.
    ///
    /// Registrations whose element left the document end here (all of them with `destroy`);
    /// uncontrolled ones are reported through [`AnimationHost::detached`], videos excepted.
    pub(crate) fn check_animation(
        &mut self,
        item: ScheduledItem,
        blurred: bool,
        destroy: bool,
        host: &mut dyn AnimationHost,
    ) {
        let Some(group) = self.by_item.get(&item).cloned() else {
            return;
        };
        if self.locked_items.contains(&item) {
            return;
        }
        let group_locked = self.locked_groups.contains(&group);
        let entries = self.entries_of(item);
        let Some(kind) = entries.first().map(|e| e.kind) else {
            return;
        };
        for entry in &entries {
            if destroy || (!group_locked && !host.is_connected(entry.element)) {
                self.drop_entry(item, entry.element);
                tracing::trace!(?item, element = ?entry.element, %group, "scheduler detach");
                if !entry.controlled && entry.kind != AnimationKind::Video {
                    host.detached(item, entry.element);
                }
            }
        }
        if !self.contains(item) {
            return;
        }

        let other_group_only = self.only_one.as_ref().is_some_and(|g| *g != group);
        if blurred
            || other_group_only
            || (kind == AnimationKind::Video && self.videos_locked)
            || self.idle_groups.contains(&group)
            || self.app_idle
        {
            if !host.is_paused(item) {
                tracing::trace!(?item, %group, "scheduler pause");
                host.pause(item);
            }
        } else if host.is_paused(item) && self.is_visible(item) && host.autoplay(item) {
            tracing::trace!(?item, %group, "scheduler play");
            host.play(item);
        }
    }

    /// Re-evaluate every item, or only those of `group`.
    ///
    /// With `skip_intersection_locked`, groups whose visibility is frozen are left alone.
    pub(crate) fn check_animations(
        &mut self,
        blurred: bool,
        group: Option<&Group>,
        destroy: bool,
        skip_intersection_locked: bool,
        host: &mut dyn AnimationHost,
    ) {
        let groups: Vec<Group> = match group {
            Some(g) if !self.by_group.contains_key(g) => return,
            Some(g) => vec![g.clone()],
            None => self.by_group.keys().cloned().collect(),
        };
        for group in groups {
            if skip_intersection_locked && self.intersection_locked.contains(&group) {
                continue;
            }
            let mut items: Vec<ScheduledItem> = self
                .by_group
                .get(&group)
                .map(|entries| entries.iter().rev().map(|e| e.item).collect())
                .unwrap_or_default();
            let mut seen = HashSet::new();
            items.retain(|item| seen.insert(*item));
            for item in items {
                self.check_animation(item, blurred, destroy, host);
            }
        }
    }

    /// Force every item of `group` to pause (`idle = true`) or release it.
    pub(crate) fn set_override_idle_group(
        &mut self,
        group: &Group,
        idle: bool,
        host: &mut dyn AnimationHost,
    ) {
        if idle {
            self.idle_groups.insert(group.clone());
        } else {
            self.idle_groups.remove(group);
        }
        self.check_animations(false, Some(group), false, false, host);
    }

    /// Restrict playback to one group, or lift the restriction with `None`.
    pub(crate) fn set_only_one_playable_group(
        &mut self,
        group: Option<Group>,
        host: &mut dyn AnimationHost,
    ) {
        self.only_one = group;
        self.check_animations(false, None, false, false, host);
    }

    #[cfg(test)]
    pub(crate) fn only_one_playable_group(&self) -> Option<&Group> {
        self.only_one.as_ref()
    }

    /// Items of a locked group survive leaving the document.
    pub(crate) fn lock_group(&mut self, group: Group) {
        self.locked_groups.insert(group);
    }

    pub(crate) fn unlock_group(&mut self, group: &Group, host: &mut dyn AnimationHost) {
        self.locked_groups.remove(group);
        self.check_animations(false, Some(group), false, false, host);
    }

    /// Freeze (`lock = true`) or resume visibility tracking for `group`.
    ///
    /// Unfreezing replays the current visibility of every element in the group.
    pub(crate) fn toggle_intersection_group(
        &mut self,
        group: &Group,
        lock: bool,
        host: &mut dyn AnimationHost,
    ) {
        if lock {
            self.intersection_locked.insert(group.clone());
            return;
        }
        self.intersection_locked.remove(group);
        let entries: Vec<_> = self
            .by_group
            .get(group)
            .map(|entries| entries.iter().map(|e| (e.item, e.element, e.kind)).collect())
            .unwrap_or_default();
        for (item, element, kind) in entries {
            let visible = self.visible_elements.contains(&element);
            self.apply_visibility(item, element, kind, visible, host);
        }
    }

    /// Application idle state; idle pauses everything outside intersection-locked groups.
    pub(crate) fn set_app_idle(&mut self, idle: bool, host: &mut dyn AnimationHost) {
        if self.app_idle == idle {
            return;
        }
        self.app_idle = idle;
        self.check_animations(idle, None, false, true, host);
    }

    /// Pause (`true`) or release every video item.
    pub(crate) fn set_videos_locked(&mut self, locked: bool, host: &mut dyn AnimationHost) {
        if self.videos_locked == locked {
            return;
        }
        self.videos_locked = locked;
        self.check_animations(false, None, false, true, host);
    }

    /// A locked item is skipped by every check.
    pub(crate) fn toggle_item_lock(&mut self, item: ScheduledItem, lock: bool) {
        if lock && self.contains(item) {
            self.locked_items.insert(item);
        } else {
            self.locked_items.remove(&item);
        }
    }

    /// Global loop setting; returns `true` when any item changed.
    pub(crate) fn set_loop(&mut self, enabled: bool, host: &mut dyn AnimationHost) -> bool {
        self.stickers_loop = enabled;
        let items: BTreeSet<_> = self
            .by_group
            .values()
            .flatten()
            .filter(|e| matches!(e.kind, AnimationKind::Lottie | AnimationKind::Video))
            .map(|e| e.item)
            .collect();
        let mut changed = false;
        for item in items {
            changed |= host.apply_loop_setting(item, enabled);
        }
        changed
    }

    /// Caller intent to play; remembered until the item becomes eligible.
    pub(crate) fn request_play(&mut self, item: ScheduledItem, host: &mut dyn AnimationHost) {
        host.set_autoplay(item, true);
        if self.contains(item) {
            self.check_animation(item, false, false, host);
        } else {
            host.play(item);
        }
    }

    /// Caller intent to pause; cleared by a later [`Self::request_play`].
    pub(crate) fn request_pause(&mut self, item: ScheduledItem, host: &mut dyn AnimationHost) {
        host.set_autoplay(item, false);
        if !host.is_paused(item) {
            host.pause(item);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/intersector.rs"]
mod tests;
