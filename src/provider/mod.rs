//! Provider lifecycle contract and the built-in providers.
//!
//! A provider produces the value bound to a token. The container drives it
//! through `register → resolve ⇄ dispose → destroy`; each call receives a
//! [`ProviderContext`] naming the container and token it runs for.
//!
//! Three providers ship with the crate:
//!
//! - [`ValueProvider`] returns a precomputed value.
//! - [`FactoryProvider`] runs an async computation, optionally cached.
//! - [`ClassProvider`] builds an instance from declared dependencies.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::resolved::AnyArc;
use crate::token::Token;

mod class;
mod context;
mod factory;
pub mod metadata;
mod value;

pub use class::{ClassContext, ClassProvider, ConstructorArgs};
pub use context::ProviderContext;
pub use factory::{FactoryContext, FactoryProvider};
pub use value::{ValueContext, ValueProvider};

/// Async user hook receiving a typed context.
pub type Hook<C> = Arc<dyn Fn(C) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;

/// Wraps an async closure into a [`Hook`].
pub fn hook<C, F, Fut>(f: F) -> Hook<C>
where
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<()>> + Send + 'static,
{
    Arc::new(move |context| f(context).boxed())
}

pub(crate) async fn run_hook<C>(hook: Option<&Hook<C>>, context: impl FnOnce() -> C) -> DiResult<()> {
    match hook {
        Some(hook) => hook(context()).await,
        None => Ok(()),
    }
}

/// Lifecycle state of a built-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderState {
    Unregistered,
    Registered,
    Resolved,
    Disposed,
    Destroyed,
}

/// Shared state tracking for the built-in providers.
#[derive(Debug)]
pub(crate) struct StateCell(Mutex<ProviderState>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(ProviderState::Unregistered))
    }

    pub(crate) fn get(&self) -> ProviderState {
        *self.0.lock()
    }

    pub(crate) fn set(&self, state: ProviderState) {
        let mut current = self.0.lock();
        if *current != ProviderState::Destroyed {
            *current = state;
        }
    }

    /// Fails once the provider has been destroyed.
    pub(crate) fn ensure_live(&self, token: &Token) -> DiResult<()> {
        if self.get() == ProviderState::Destroyed {
            return Err(DiError::ProviderDestroyed(token.id().to_string()));
        }
        Ok(())
    }
}

/// Lifecycle contract every binding target implements.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use ferrous_ioc::{AnyArc, DiResult, Provider, ProviderContext, ProviderState, Token};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// #[async_trait]
/// impl Provider for Clock {
///     fn token(&self) -> Token {
///         Token::new("clock")
///     }
///
///     fn state(&self) -> ProviderState {
///         ProviderState::Registered
///     }
///
///     async fn register(&self, _cx: &ProviderContext) -> DiResult<()> {
///         Ok(())
///     }
///
///     async fn resolve(&self, _cx: &ProviderContext) -> DiResult<AnyArc> {
///         Ok(Arc::new(1_700_000_000u64))
///     }
///
///     async fn dispose(&self, _cx: &ProviderContext) -> DiResult<()> {
///         Ok(())
///     }
///
///     async fn destroy(&self, _cx: &ProviderContext) -> DiResult<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Explicit token, or the identity derived from the produced type.
    fn token(&self) -> Token;

    /// Tokens this provider's construction depends on.
    fn dependencies(&self) -> Vec<Token> {
        Vec::new()
    }

    fn state(&self) -> ProviderState;

    /// Short label used in diagnostics.
    fn kind(&self) -> &'static str {
        "custom"
    }

    /// One-time setup, run once per container registration.
    async fn register(&self, cx: &ProviderContext) -> DiResult<()>;

    /// Produces the value according to the provider's caching policy.
    async fn resolve(&self, cx: &ProviderContext) -> DiResult<AnyArc>;

    /// Releases cached values; the provider stays usable.
    async fn dispose(&self, cx: &ProviderContext) -> DiResult<()>;

    /// Irreversible teardown.
    async fn destroy(&self, cx: &ProviderContext) -> DiResult<()>;

    /// Boxes the provider for [`Container::register_many`](crate::Container::register_many).
    fn into_shared(self) -> Arc<dyn Provider>
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind())
            .field("token", &self.token())
            .field("state", &self.state())
            .finish()
    }
}

/// Deduplicates tokens by id keeping first occurrences.
pub(crate) fn dedup_tokens(tokens: &mut Vec<Token>) {
    let mut seen = std::collections::HashSet::new();
    tokens.retain(|token| seen.insert(token.clone()));
}
