use super::*;

#[test]
fn frame_rate_comes_from_header() {
    assert_eq!(sniff_frame_rate(br#"{"v":"5.5","fr":30,"layers":[]}"#), Some(30.0));
    assert_eq!(sniff_frame_rate(br#"{"v":"5.5"}"#), None);
    assert_eq!(sniff_frame_rate(b"\x1f\x8b binary"), None);
}

#[test]
fn fps_resolution_order_and_clamp() {
    assert_eq!(resolve_fps(Some(24.0), br#"{"fr":30}"#), 24.0);
    assert_eq!(resolve_fps(None, br#"{"fr":30}"#), 30.0);
    assert_eq!(resolve_fps(None, b"opaque"), DEFAULT_FPS);
    assert_eq!(resolve_fps(Some(120.0), b""), 60.0);
    assert_eq!(resolve_fps(None, br#"{"fr":0.5}"#), 1.0);
    assert_eq!(resolve_fps(Some(f64::NAN), b""), DEFAULT_FPS);
}
