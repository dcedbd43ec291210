//! Shared, reference-counted storage of decoded animation frames.

pub(crate) mod frames;
