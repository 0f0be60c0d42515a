//! Core traits of the container.

mod dispose;
mod resolver;

pub use dispose::AsyncDispose;
pub use resolver::{Resolver, ResolverCore};
