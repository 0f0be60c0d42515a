//! Type-erased values produced by resolution.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::token::Token;

/// Type-erased shared value, as returned by providers.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Outcome of resolving a token.
///
/// Tokens bound to a single provider resolve to [`Resolved::One`]; tokens
/// bound to a provider list or fanned out through an alias list resolve to
/// [`Resolved::Many`], in binding order. Nested fan-outs keep their shape.
#[derive(Clone)]
pub enum Resolved {
    One(AnyArc),
    Many(Vec<Resolved>),
}

impl Resolved {
    /// Downcasts a single value.
    ///
    /// Fails with [`DiError::TypeMismatch`] if the value is of another type or
    /// if the token resolved to a list.
    pub fn downcast<T: Send + Sync + 'static>(self, token: &Token) -> DiResult<Arc<T>> {
        match self {
            Resolved::One(value) => value.downcast::<T>().map_err(|_| {
                DiError::type_mismatch(token.id(), format!("value is not a {}", type_name::<T>()))
            }),
            Resolved::Many(values) => Err(DiError::type_mismatch(
                token.id(),
                format!("token resolves to {} values", values.len()),
            )),
        }
    }

    /// Flattens and downcasts every leaf value.
    pub fn downcast_all<T: Send + Sync + 'static>(self, token: &Token) -> DiResult<Vec<Arc<T>>> {
        self.flatten()
            .into_iter()
            .map(|value| Resolved::One(value).downcast::<T>(token))
            .collect()
    }

    /// All leaf values in order.
    pub fn flatten(self) -> Vec<AnyArc> {
        match self {
            Resolved::One(value) => vec![value],
            Resolved::Many(values) => values.into_iter().flat_map(Resolved::flatten).collect(),
        }
    }

    /// The single value, if this is not a list.
    pub fn one(&self) -> Option<&AnyArc> {
        match self {
            Resolved::One(value) => Some(value),
            Resolved::Many(_) => None,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Resolved::Many(_))
    }

    /// Number of leaf values.
    pub fn len(&self) -> usize {
        match self {
            Resolved::One(_) => 1,
            Resolved::Many(values) => values.iter().map(Resolved::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<AnyArc> for Resolved {
    fn from(value: AnyArc) -> Self {
        Resolved::One(value)
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::One(_) => f.write_str("One(..)"),
            Resolved::Many(values) => f.debug_tuple("Many").field(values).finish(),
        }
    }
}
