//! Context handed to providers on every lifecycle call.

use crate::container::Container;
use crate::token::Token;

/// The container and token a provider is operating for.
///
/// The same provider may be bound in several containers. Each lifecycle call
/// receives the container that initiated it and the token it is bound to
/// there, so providers never store a back-reference to their owner.
#[derive(Clone, Debug)]
pub struct ProviderContext {
    pub container: Container,
    pub token: Token,
}

impl ProviderContext {
    pub fn new(container: Container, token: Token) -> Self {
        Self { container, token }
    }
}
