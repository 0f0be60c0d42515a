//! Token identity for bindable entities.

use std::any::{type_name, Any};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Separator used by [`Token::create`] and [`Token::concat`].
pub const TOKEN_SEPARATOR: &str = ":";

/// Identifier for a binding in a [`Container`](crate::Container).
///
/// Two tokens name the same binding exactly when their ids are equal;
/// container logic never compares tokens by reference. Tokens are cheap to
/// clone (the id is shared).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::Token;
///
/// let token = Token::create(["database", "primary"]);
/// assert_eq!(token.id(), "database:primary");
/// assert!(token.matches("database:primary"));
///
/// let replica = Token::from("database").variant("replica");
/// assert_eq!(replica.to_string(), "database:replica");
///
/// struct Mailer;
/// assert_eq!(Token::of::<Mailer>(), Token::of::<Mailer>());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    id: Arc<str>,
}

impl Token {
    /// Creates a token from a raw id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Arc::from(id.into()),
        }
    }

    /// Creates a token by joining `parts` with `:`.
    pub fn create<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<S> = parts.into_iter().collect();
        let joined = parts
            .iter()
            .map(|part| part.as_ref())
            .collect::<Vec<_>>()
            .join(TOKEN_SEPARATOR);
        Self::new(joined)
    }

    /// Token derived from a type's name.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(type_name::<T>())
    }

    /// Concatenates the ids of `tokens` into a compound token.
    pub fn concat<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Borrow<Token>,
    {
        let ids: Vec<T> = tokens.into_iter().collect();
        Self::create(ids.iter().map(|token| token.borrow().id()))
    }

    /// Compound token of `self` followed by `other`.
    pub fn variant(&self, other: impl Into<Token>) -> Self {
        Self::concat([self.clone(), other.into()])
    }

    /// Converts a dynamically typed value into a token.
    ///
    /// Accepts a [`Token`], a `String` or a `&'static str`. Anything else
    /// fails with [`DiError::InvalidToken`].
    pub fn from_any(value: &dyn Any) -> DiResult<Self> {
        Self::try_from_any(value).ok_or_else(|| {
            DiError::InvalidToken(format!("{:?} cannot be converted into a token", value.type_id()))
        })
    }

    /// Like [`Token::from_any`] but returns `None` instead of failing.
    pub fn try_from_any(value: &dyn Any) -> Option<Self> {
        if let Some(token) = value.downcast_ref::<Token>() {
            return Some(token.clone());
        }
        if let Some(id) = value.downcast_ref::<String>() {
            return Some(Self::new(id.as_str()));
        }
        value.downcast_ref::<&'static str>().map(|id| Self::new(*id))
    }

    /// The string identity of this token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id equality with anything convertible into a token.
    pub fn matches(&self, other: impl Into<Token>) -> bool {
        self.id == other.into().id
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.id()).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for Token {
    fn from(id: &str) -> Self {
        Token::new(id)
    }
}

impl From<String> for Token {
    fn from(id: String) -> Self {
        Token::new(id)
    }
}

impl From<&String> for Token {
    fn from(id: &String) -> Self {
        Token::new(id.as_str())
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_joins_parts() {
        assert_eq!(Token::create(["a", "b"]).id(), "a:b");
        assert_eq!(Token::create(Vec::<&str>::new()).id(), "");
    }

    #[test]
    fn from_any_accepts_tokens_and_strings() {
        let token = Token::new("x");
        assert_eq!(Token::from_any(&token).unwrap(), token);
        assert_eq!(Token::from_any(&String::from("x")).unwrap(), token);
        assert_eq!(Token::from_any(&"x").unwrap(), token);
    }

    #[test]
    fn from_any_rejects_other_values() {
        assert!(matches!(Token::from_any(&42u32), Err(DiError::InvalidToken(_))));
        assert!(Token::try_from_any(&1.5f64).is_none());
    }
}
