use super::*;

fn key(name: &str) -> CacheKey {
    CacheKey::new(name, PixelSize::new(2, 2), None, None)
}

fn raw(v: u8) -> FrameData {
    FrameData::from_pixels(PixelSize::new(2, 2), vec![v; 16], FrameStorage::RawPixels).unwrap()
}

#[test]
fn balanced_acquire_release_leaves_nothing_live() {
    let mut cache = FrameCache::new();
    let a = key("a");
    let b = key("b");
    for _ in 0..5 {
        cache.acquire(&a, CacheClass::Regular);
    }
    cache.acquire(&b, CacheClass::Regular).insert(0, raw(1));
    assert_eq!(cache.counter(&a), 5);
    assert_eq!(cache.live_entries(), 2);

    let mut removed = 0;
    for _ in 0..5 {
        if cache.release(&a) {
            removed += 1;
        }
    }
    assert!(cache.release(&b));
    assert_eq!(removed, 1, "entry must be removed exactly once");
    assert_eq!(cache.live_entries(), 0);
    assert_eq!(cache.retained_entries(), 0);
}

#[test]
fn extra_releases_clamp_at_zero() {
    let mut cache = FrameCache::new();
    let a = key("a");
    cache.acquire(&a, CacheClass::Regular);
    assert!(cache.release(&a));
    assert!(!cache.release(&a));
    assert!(!cache.release(&a));
    assert_eq!(cache.counter(&a), 0);

    cache.acquire(&a, CacheClass::Regular);
    assert_eq!(cache.counter(&a), 1);
}

#[test]
fn small_icons_survive_last_release() {
    let mut cache = FrameCache::new();
    let a = key("icon");
    cache.acquire(&a, CacheClass::SmallIcon).insert(3, raw(7));
    assert!(!cache.release(&a));
    assert_eq!(cache.live_entries(), 0);
    assert_eq!(cache.retained_entries(), 1);
    assert!(cache.get(&a).unwrap().contains(3));

    cache.acquire(&a, CacheClass::SmallIcon);
    assert_eq!(cache.counter(&a), 1);
    assert!(!cache.release(&a));
    assert!(!cache.release(&a), "underflow on a retained entry is clamped too");
}

#[test]
fn a_frame_is_held_in_one_storage_form() {
    let mut entry = FrameCacheEntry::new(CacheClass::Regular);
    entry.insert(0, raw(1));
    let raster =
        FrameData::from_pixels(PixelSize::new(2, 2), vec![9; 16], FrameStorage::Raster).unwrap();
    entry.insert(0, raster);
    assert_eq!(entry.len(), 1);
    assert!(matches!(entry.get(0), Some(FrameData::Raster(_))));
    assert_eq!(entry.get(0).unwrap().as_bytes()[0], 9);

    entry.clear();
    assert!(entry.is_empty());
}

#[test]
fn mismatched_pixel_length_is_rejected() {
    assert!(FrameData::from_pixels(PixelSize::new(2, 2), vec![0; 3], FrameStorage::Raster).is_none());
}

#[test]
fn key_display_names_every_component() {
    let tinted = CacheKey::new("s", PixelSize::new(2, 2), Some("accent".into()), Some(3));
    assert!(tinted.is_tinted());
    assert_eq!(tinted.tone(), Some(3));
    assert_eq!(tinted.to_string(), "s-2-2-colored:accent-3");
    assert_eq!(key("s").to_string(), "s-2-2");
}

#[test]
fn unshared_buffers_can_be_recycled() {
    let data = raw(4);
    let copy = data.clone();
    drop(copy);
    assert_eq!(data.into_recyclable().map(|v| v.len()), Some(16));
}
