use super::*;
use crate::foundation::config::DeviceClass;

fn device(class: DeviceClass, ratio: f64, mobile_layout: bool) -> DeviceProfile {
    DeviceProfile {
        class,
        pixel_ratio: ratio,
        mobile_layout,
    }
}

#[test]
fn small_animations_skip_on_constrained_devices() {
    let phone = device(DeviceClass::Mobile, 2.0, true);
    let desk = device(DeviceClass::Desktop, 2.0, false);
    let small = PixelSize::new(48, 48);
    assert_eq!(skip_delta(&phone, small, false, None), 2);
    assert_eq!(skip_delta(&phone, small, true, None), 1);
    assert_eq!(skip_delta(&phone, PixelSize::new(200, 48), false, None), 1);
    assert_eq!(skip_delta(&desk, small, false, None), 1);
    assert_eq!(skip_delta(&desk, small, false, Some(0.25)), 4);
    assert_eq!(skip_delta(&desk, small, false, Some(0.0)), 1);
}

#[test]
fn fps_adjustment_never_reaches_zero() {
    assert_eq!(adjust_skip_for_fps(2, 60.0), 2);
    assert_eq!(adjust_skip_for_fps(2, 30.0), 1);
    assert_eq!(adjust_skip_for_fps(4, 30.0), 2);
    assert_eq!(adjust_skip_for_fps(2, 15.0), 1);
    assert_eq!(adjust_skip_for_fps(1, 30.0), 1);
}

#[test]
fn display_scaling_follows_size_class() {
    let desk = device(DeviceClass::Desktop, 3.0, false);
    assert_eq!(
        scale_for_display(&desk, PixelSize::new(200, 200), false),
        PixelSize::new(400, 400)
    );
    assert_eq!(
        scale_for_display(&desk, PixelSize::new(20, 20), false),
        PixelSize::new(30, 30)
    );
    assert_eq!(
        scale_for_display(&desk, PixelSize::new(20, 20), true),
        PixelSize::new(40, 40)
    );

    let android = device(DeviceClass::Mobile, 2.0, true);
    assert_eq!(
        scale_for_display(&android, PixelSize::new(200, 200), false),
        PixelSize::new(200, 200)
    );

    let lowdpi = device(DeviceClass::Desktop, 1.0, false);
    assert_eq!(
        scale_for_display(&lowdpi, PixelSize::new(20, 20), false),
        PixelSize::new(20, 20)
    );
}

#[test]
fn cache_policy_by_scaled_size() {
    let mac = device(DeviceClass::Apple, 2.0, false);
    let desk = device(DeviceClass::Desktop, 2.0, false);
    assert_eq!(
        CachePolicy::for_surface(&mac, PixelSize::new(240, 240), false),
        CachePolicy::Partial(2)
    );
    assert_eq!(
        CachePolicy::for_surface(&desk, PixelSize::new(240, 240), false),
        CachePolicy::Partial(4)
    );
    assert_eq!(
        CachePolicy::for_surface(&desk, PixelSize::new(36, 36), false),
        CachePolicy::Every
    );
    assert_eq!(
        CachePolicy::for_surface(&desk, PixelSize::new(36, 36), true),
        CachePolicy::Disabled
    );
}

#[test]
fn partial_policy_keeps_first_and_non_multiples() {
    let p = CachePolicy::Partial(4);
    let kept: Vec<u32> = (0..9).filter(|f| p.should_store(*f)).collect();
    assert_eq!(kept, vec![0, 1, 2, 3, 5, 6, 7]);
    assert!(!CachePolicy::Disabled.should_store(0));
}
