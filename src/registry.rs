//! Insertion-ordered set of tokens.

use indexmap::IndexSet;

use crate::token::Token;

/// Ordered set of tokens, compared by id.
///
/// Used by [`EventPhase`](crate::EventPhase) to remember which owners
/// declared handlers, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: IndexSet<Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `token`; returns false if it was already present.
    pub fn add(&mut self, token: impl Into<Token>) -> bool {
        self.tokens.insert(token.into())
    }

    pub fn has(&self, token: impl Into<Token>) -> bool {
        self.tokens.contains(&token.into())
    }

    /// Removes `token` keeping the order of the others.
    pub fn delete(&mut self, token: impl Into<Token>) -> bool {
        self.tokens.shift_remove(&token.into())
    }

    pub fn values(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
