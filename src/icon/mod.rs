//! Compound status icons: named frame ranges of one asset played as state transitions.

pub(crate) mod composer;
