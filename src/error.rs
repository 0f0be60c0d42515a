//! Error types for the inversion-of-control container.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Shared, thread-safe boxed error used to carry failures from user code.
pub type DynError = dyn StdError + Send + Sync + 'static;

/// Container errors
///
/// Every fallible operation of the container, its providers, observers and
/// lifecycle phases reports one of these variants. Nothing is caught
/// internally: an error aborts the operation that awaited it and surfaces
/// to the original caller.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::DiError;
///
/// let cycle = DiError::CircularDependency(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(cycle.to_string(), "Circular dependency detected: A -> B -> A");
/// assert_eq!(cycle.cycle().map(|path| path.len()), Some(3));
///
/// let missing = DiError::UnregisteredToken("database".into());
/// assert_eq!(missing.to_string(), "Token is not registered: database");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// A value could not be turned into a token
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// No pointer for the token anywhere in the scope chain
    #[error("Token is not registered: {0}")]
    UnregisteredToken(String),
    /// The token already has a pointer in this container
    #[error("Token is already registered: {0}")]
    DuplicateBinding(String),
    /// Operation on a pointer or value of the wrong kind
    #[error("Type mismatch for {token}: {reason}")]
    TypeMismatch { token: String, reason: String },
    /// Dependency cycle, with the full path
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    /// Alias cycle, with the full path
    #[error("Circular mapping detected: {}", .0.join(" -> "))]
    CircularMapping(Vec<String>),
    /// A registration was attempted without any provider
    #[error("No provider supplied for token: {0}")]
    MissingProvider(String),
    /// The provider was destroyed and can no longer be used
    #[error("Provider for token {0} has been destroyed")]
    ProviderDestroyed(String),
    /// A hook or observer vetoed the operation
    #[error("Operation rejected: {0}")]
    Rejected(String),
    /// Failure raised by user code
    #[error(transparent)]
    Other(Arc<DynError>),
}

impl DiError {
    /// Builds a [`DiError::TypeMismatch`].
    pub fn type_mismatch(token: impl Into<String>, reason: impl Into<String>) -> Self {
        DiError::TypeMismatch {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`DiError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        DiError::Rejected(reason.into())
    }

    /// Wraps a foreign error raised by a factory, constructor or hook.
    pub fn other<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DiError::Other(Arc::new(error))
    }

    /// The cycle path for circular dependency or mapping errors.
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            DiError::CircularDependency(path) | DiError::CircularMapping(path) => Some(path),
            _ => None,
        }
    }

    /// True when the error reports a missing binding.
    pub fn is_unregistered(&self) -> bool {
        matches!(self, DiError::UnregisteredToken(_))
    }
}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;
