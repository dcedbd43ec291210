use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PlaybackError::decode("x")
            .to_string()
            .contains("decode error:")
    );
    assert!(PlaybackError::size("x").to_string().contains("size error:"));
    assert!(
        PlaybackError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PlaybackError::worker("x")
            .to_string()
            .contains("worker error:")
    );
}

#[test]
fn cancellation_is_distinguished_from_decode_failures() {
    assert!(PlaybackError::Cancelled.is_cancelled());
    assert!(!PlaybackError::decode("corrupt").is_cancelled());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PlaybackError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
