//! Background decoding: typed request/response protocol and the fixed worker pool.

pub(crate) mod decoder;
pub(crate) mod pool;
pub(crate) mod protocol;

#[cfg(test)]
#[path = "../../tests/unit/support.rs"]
pub(crate) mod testing;
