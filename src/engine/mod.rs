//! The facade hosts talk to: requests, ticks, scheduling and renderer management.

pub(crate) mod host;
pub(crate) mod playback;
pub(crate) mod request;
pub(crate) mod view;
