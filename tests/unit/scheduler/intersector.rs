use super::*;

#[derive(Debug, Default)]
struct Fake {
    paused: HashMap<ScheduledItem, bool>,
    autoplay: HashMap<ScheduledItem, bool>,
    looping: HashMap<ScheduledItem, bool>,
    disconnected: HashSet<ElementId>,
    detached: Vec<(ScheduledItem, ElementId)>,
    cleared: Vec<ScheduledItem>,
}

impl Fake {
    fn with(items: &[ScheduledItem]) -> Self {
        let mut fake = Self::default();
        for &item in items {
            fake.paused.insert(item, true);
            fake.autoplay.insert(item, true);
            fake.looping.insert(item, true);
        }
        fake
    }

    fn playing(&self, item: ScheduledItem) -> bool {
        !self.is_paused(item)
    }
}

impl AnimationHost for Fake {
    fn is_paused(&self, item: ScheduledItem) -> bool {
        self.paused.get(&item).copied().unwrap_or(true)
    }

    fn autoplay(&self, item: ScheduledItem) -> bool {
        self.autoplay.get(&item).copied().unwrap_or(false)
    }

    fn set_autoplay(&mut self, item: ScheduledItem, autoplay: bool) {
        self.autoplay.insert(item, autoplay);
    }

    fn play(&mut self, item: ScheduledItem) {
        self.paused.insert(item, false);
    }

    fn pause(&mut self, item: ScheduledItem) {
        self.paused.insert(item, true);
    }

    fn detached(&mut self, item: ScheduledItem, element: ElementId) {
        self.detached.push((item, element));
    }

    fn is_connected(&self, element: ElementId) -> bool {
        !self.disconnected.contains(&element)
    }

    fn clear_cache(&mut self, item: ScheduledItem) {
        self.cleared.push(item);
    }

    fn is_looping(&self, item: ScheduledItem) -> bool {
        self.looping.get(&item).copied().unwrap_or(false)
    }

    fn apply_loop_setting(&mut self, item: ScheduledItem, enabled: bool) -> bool {
        let looping = self.looping.entry(item).or_insert(false);
        let changed = *looping != enabled;
        *looping = enabled;
        changed
    }
}

const A: ScheduledItem = ScheduledItem::Player(PlayerId(1));
const B: ScheduledItem = ScheduledItem::Player(PlayerId(2));

fn reg(item: ScheduledItem, group: Group, element: u64) -> Registration {
    Registration {
        item,
        group,
        element: ElementId(element),
        controlled: false,
        locked: false,
        kind: AnimationKind::Lottie,
    }
}

#[test]
fn offscreen_items_wait_for_visibility() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    assert!(!host.playing(A));

    s.request_play(A, &mut host);
    assert!(!host.playing(A), "invisible items stay paused");

    s.set_visibility(ElementId(10), true, &mut host);
    assert!(host.playing(A), "the earlier play intent is remembered");
}

#[test]
fn already_visible_elements_admit_immediately() {
    let mut host = Fake::with(&[A, B]);
    let mut s = AnimationScheduler::new(true);
    s.set_visibility(ElementId(10), true, &mut host);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    assert!(host.playing(A));
    assert!(s.is_visible(A));
}

#[test]
fn leaving_the_viewport_pauses_and_clears_the_cache() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_visibility(ElementId(10), false, &mut host);
    assert!(!host.playing(A));
    assert_eq!(host.cleared, vec![A]);
    assert!(s.contains(A), "pausing never deregisters");
}

#[test]
fn idle_group_override_wins_over_visibility() {
    let mut host = Fake::with(&[A, B]);
    let mut s = AnimationScheduler::new(true);
    let popup = Group::new("STICKERS-POPUP");
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(B, popup.clone(), 11), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_visibility(ElementId(11), true, &mut host);

    s.set_visibility(ElementId(10), true, &mut host);
    s.set_override_idle_group(&Group::CHAT, true, &mut host);
    assert!(!host.playing(A));
    assert!(host.playing(B));

    s.set_visibility(ElementId(10), true, &mut host);
    assert!(!host.playing(A));

    s.set_override_idle_group(&Group::CHAT, false, &mut host);
    assert!(host.playing(A));
}

#[test]
fn only_one_playable_group() {
    let mut host = Fake::with(&[A, B]);
    let mut s = AnimationScheduler::new(true);
    let viewer = Group::new("STICKER-VIEWER");
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(B, viewer.clone(), 11), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_visibility(ElementId(11), true, &mut host);

    s.set_only_one_playable_group(Some(viewer.clone()), &mut host);
    assert!(!host.playing(A));
    assert!(host.playing(B));
    assert_eq!(s.only_one_playable_group(), Some(&viewer));

    s.set_only_one_playable_group(None, &mut host);
    assert!(host.playing(A));
}

#[test]
fn disconnected_elements_are_removed_and_reported() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    host.disconnected.insert(ElementId(10));
    s.check_animations(false, None, false, false, &mut host);
    assert!(!s.contains(A));
    assert_eq!(host.detached, vec![(A, ElementId(10))]);
}

#[test]
fn controlled_items_are_deregistered_silently() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    let mut r = reg(A, Group::CHAT, 10);
    r.controlled = true;
    s.add_animation(r, &mut host);
    host.disconnected.insert(ElementId(10));
    s.check_animations(false, None, false, false, &mut host);
    assert!(!s.contains(A));
    assert!(host.detached.is_empty());
}

#[test]
fn locked_groups_skip_the_document_check() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    let g = Group::new("lock");
    s.add_animation(reg(A, g.clone(), 10), &mut host);
    s.lock_group(g.clone());
    host.disconnected.insert(ElementId(10));
    s.check_animations(false, None, false, false, &mut host);
    assert!(s.contains(A));

    s.unlock_group(&g, &mut host);
    assert!(!s.contains(A));
}

#[test]
fn locked_items_are_skipped() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.toggle_item_lock(A, true);
    s.set_visibility(ElementId(10), true, &mut host);
    assert!(!host.playing(A));
    s.toggle_item_lock(A, false);
    s.check_animation(A, false, false, &mut host);
    assert!(host.playing(A));
}

#[test]
fn intersection_locked_groups_ignore_visibility_until_unlocked() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.toggle_intersection_group(&Group::CHAT, true, &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    assert!(!host.playing(A));

    s.toggle_intersection_group(&Group::CHAT, false, &mut host);
    assert!(host.playing(A));
}

#[test]
fn app_idle_pauses_and_resumes() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_app_idle(true, &mut host);
    assert!(!host.playing(A));
    s.set_app_idle(false, &mut host);
    assert!(host.playing(A));
}

#[test]
fn videos_can_be_locked_and_are_never_reported() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    let mut r = reg(A, Group::CHAT, 10);
    r.kind = AnimationKind::Video;
    s.add_animation(r, &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_videos_locked(true, &mut host);
    assert!(!host.playing(A));
    s.set_videos_locked(false, &mut host);
    assert!(host.playing(A));

    host.disconnected.insert(ElementId(10));
    s.check_animations(false, None, false, false, &mut host);
    assert!(!s.contains(A));
    assert!(host.detached.is_empty());
    assert!(host.cleared.is_empty());
}

#[test]
fn loop_setting_applies_on_add_and_globally() {
    let mut host = Fake::with(&[A, B]);
    let mut s = AnimationScheduler::new(false);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    assert!(!host.is_looping(A));

    s.add_animation(reg(B, Group::CHAT, 11), &mut host);
    assert!(s.set_loop(true, &mut host));
    assert!(host.is_looping(A) && host.is_looping(B));
    assert!(!s.set_loop(true, &mut host));
}

#[test]
fn request_pause_clears_the_play_intent() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);
    s.request_pause(A, &mut host);
    assert!(!host.playing(A));
    s.set_visibility(ElementId(10), true, &mut host);
    assert!(!host.playing(A));
    s.request_play(A, &mut host);
    assert!(host.playing(A));
}

#[test]
fn duplicate_adds_keep_the_first_group() {
    let mut host = Fake::with(&[A, B]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(A, Group::EMOJI, 10), &mut host);
    s.add_animation(reg(B, Group::EMOJI, 10), &mut host);
    assert_eq!(s.len(), 2);
    s.set_visibility(ElementId(10), true, &mut host);
    s.set_override_idle_group(&Group::CHAT, true, &mut host);
    assert!(!host.playing(A));
    assert!(host.playing(B));

    s.release(A, ElementId(10));
    assert!(s.contains(A), "A was registered twice");
    s.release(A, ElementId(10));
    s.release(B, ElementId(10));
    assert_eq!(s.len(), 0);
    assert!(host.detached.is_empty());
}

#[test]
fn shared_items_play_while_any_element_is_visible() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(A, Group::CHAT, 11), &mut host);
    assert_eq!(s.len(), 1);

    s.set_visibility(ElementId(11), true, &mut host);
    assert!(host.playing(A), "a later element counts too");

    s.set_visibility(ElementId(10), true, &mut host);
    s.set_visibility(ElementId(11), false, &mut host);
    assert!(host.playing(A));
    assert!(host.cleared.is_empty());

    s.set_visibility(ElementId(10), false, &mut host);
    assert!(!host.playing(A));
    assert_eq!(host.cleared, vec![A]);
}

#[test]
fn leaving_the_document_ends_one_element_at_a_time() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(A, Group::CHAT, 11), &mut host);
    s.set_visibility(ElementId(11), true, &mut host);

    host.disconnected.insert(ElementId(10));
    s.check_animations(false, None, false, false, &mut host);
    assert!(s.contains(A));
    assert_eq!(s.elements_of(A), vec![ElementId(11)]);
    assert_eq!(host.detached, vec![(A, ElementId(10))]);
    assert!(host.playing(A));

    host.disconnected.insert(ElementId(11));
    s.check_animations(false, None, false, false, &mut host);
    assert!(!s.contains(A));
    assert_eq!(host.detached, vec![(A, ElementId(10)), (A, ElementId(11))]);
}

#[test]
fn forget_drops_every_registration() {
    let mut host = Fake::with(&[A]);
    let mut s = AnimationScheduler::new(true);
    s.add_animation(reg(A, Group::CHAT, 10), &mut host);
    s.add_animation(reg(A, Group::CHAT, 11), &mut host);
    s.set_visibility(ElementId(10), true, &mut host);

    s.forget(A);
    assert!(!s.contains(A));
    assert!(!s.is_visible(A));
    assert!(s.elements_of(A).is_empty());
    assert!(host.detached.is_empty());
}
