use super::*;

#[test]
fn missing_fields_take_defaults() {
    let cfg = EngineConfig::from_json_str(r#"{"workers": 2, "device": {"class": "apple"}}"#)
        .unwrap();
    assert_eq!(cfg.workers, 2);
    assert!(cfg.device.is_apple());
    assert!(!cfg.device.is_constrained());
    assert_eq!(cfg.device.pixel_ratio, 1.0);
    assert_eq!(cfg.compositor_fps, 60);
    assert_eq!(cfg.viewport_margin_factor, 2.5);
    assert_eq!(cfg.first_frame_timeout_ms, 2500);
    assert!(cfg.stickers_loop);
    assert_eq!(cfg.worker_mode, WorkerMode::Threads);
}

#[test]
fn enums_use_snake_case() {
    let cfg = EngineConfig::from_json_str(
        r#"{"worker_mode": "inline", "frame_storage": "raster", "device": {"class": "apple_constrained"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.worker_mode, WorkerMode::Inline);
    assert_eq!(cfg.frame_storage, FrameStorage::Raster);
    assert!(cfg.device.is_constrained());
}

#[test]
fn invalid_values_are_rejected() {
    assert!(EngineConfig::from_json_str(r#"{"workers": 0}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"compositor_fps": 0}"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{"device": {"pixel_ratio": -1.0}}"#).is_err());
    let err = EngineConfig::from_json_str("{not json").unwrap_err();
    assert!(err.to_string().contains("parse engine config JSON"));
}

#[test]
fn missing_file_is_a_validation_error() {
    let err = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, crate::foundation::error::PlaybackError::Validation(_)));
}

#[test]
fn default_is_valid() {
    EngineConfig::default().validate().unwrap();
    assert_eq!(
        EngineConfig::default().compositor_interval(),
        std::time::Duration::from_secs_f64(1.0 / 60.0)
    );
}
