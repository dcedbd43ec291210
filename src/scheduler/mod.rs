//! Visibility- and group-driven admission of animations.

pub(crate) mod intersector;
