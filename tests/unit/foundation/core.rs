use super::*;

#[test]
fn pixel_size_scaling_rounds() {
    let s = PixelSize::new(18, 18).scaled(1.5);
    assert_eq!(s, PixelSize::new(27, 27));
    assert_eq!(PixelSize::new(3, 2).rgba_len(), 24);
    assert!(PixelSize::new(0, 10).is_empty());
}

#[test]
fn rgb_hex_parsing() {
    assert_eq!(Rgb::from_hex("#ff8000").unwrap(), Rgb::new(255, 128, 0));
    assert_eq!(Rgb::from_hex("0a0b0c").unwrap(), Rgb::new(10, 11, 12));
    assert!(Rgb::from_hex("#fff").is_err());
    assert!(Rgb::from_hex("#gg0000").is_err());
}

#[test]
fn loop_mode_counts_collapse_to_once() {
    assert_eq!(LoopMode::times(0), LoopMode::Once);
    assert_eq!(LoopMode::times(1), LoopMode::Once);
    assert!(matches!(LoopMode::times(3), LoopMode::Times(n) if n.get() == 3));
    assert_eq!(LoopMode::from(true), LoopMode::Forever);
    assert!(!LoopMode::from(false).is_looping());
}

#[test]
fn direction_toward() {
    assert_eq!(Direction::toward(10, 40), Direction::Forward);
    assert_eq!(Direction::toward(40, 10), Direction::Backward);
    assert_eq!(Direction::Backward.sign(), -1);
}
