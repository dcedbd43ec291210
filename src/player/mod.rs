//! Animation players: per-instance playback state machines and the registry that owns them.

pub(crate) mod kind;
pub(crate) mod loader;
pub(crate) mod lottie;
pub(crate) mod policy;
pub(crate) mod tint;
pub(crate) mod video;
