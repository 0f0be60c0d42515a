//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod hooks;
