/// Convenience result type used across the playback engine.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    /// The decoder could not parse or render the animation payload. Terminal for the player.
    #[error("decode error: {0}")]
    Decode(String),

    /// The consumer that requested the work no longer exists.
    ///
    /// Normal teardown races end up here; callers treat it as a silent no-op.
    #[error("cancelled: requester is gone")]
    Cancelled,

    /// A player was requested without a determinable target size.
    #[error("size error: {0}")]
    Size(String),

    /// Invalid caller-provided data (configuration, part tables, frame bounds).
    #[error("validation error: {0}")]
    Validation(String),

    /// The decode worker pool could not accept or deliver a message.
    #[error("worker error: {0}")]
    Worker(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlaybackError {
    /// Build a [`PlaybackError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`PlaybackError::Size`] value.
    pub fn size(msg: impl Into<String>) -> Self {
        Self::Size(msg.into())
    }

    /// Build a [`PlaybackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PlaybackError::Worker`] value.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    /// Return `true` for the teardown-race condition that must never be reported as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
