//! Synchronized multi-instance rendering of inline emoji.
//!
//! Every distinct `(asset, size)` gets one backing player; each renderer redraws that player's
//! latest frame at the position of every visible occurrence on its own compositor canvas.

pub(crate) mod registry;
pub(crate) mod renderer;
pub(crate) mod viewport;
