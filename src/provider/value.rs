//! Provider for precomputed values.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::container::Container;
use crate::error::DiResult;
use crate::resolved::AnyArc;
use crate::token::Token;

use super::{dedup_tokens, hook, run_hook, Hook, Provider, ProviderContext, ProviderState, StateCell};

/// Context passed to [`ValueProvider`] hooks.
pub struct ValueContext<T> {
    pub container: Container,
    pub token: Token,
    pub dependencies: Vec<Token>,
    pub value: Arc<T>,
}

impl<T> Clone for ValueContext<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            token: self.token.clone(),
            dependencies: self.dependencies.clone(),
            value: self.value.clone(),
        }
    }
}

/// Binds a token to a value computed ahead of time.
///
/// Every resolve returns the same `Arc`. Dispose and destroy only run the
/// optional hooks.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Resolver, ValueProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let container = Container::new();
/// container.register("port", ValueProvider::new(8080u16)).await?;
///
/// let port = container.get::<u16>("port").await?;
/// assert_eq!(*port, 8080);
/// # Ok(())
/// # }
/// ```
pub struct ValueProvider<T: Send + Sync + 'static> {
    value: Arc<T>,
    token: Option<Token>,
    dependencies: Vec<Token>,
    on_register: Option<Hook<ValueContext<T>>>,
    on_resolve: Option<Hook<ValueContext<T>>>,
    on_dispose: Option<Hook<ValueContext<T>>>,
    on_destroy: Option<Hook<ValueContext<T>>>,
    state: StateCell,
}

impl<T: Send + Sync + 'static> ValueProvider<T> {
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value; resolves return clones of this `Arc`.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            value,
            token: None,
            dependencies: Vec::new(),
            on_register: None,
            on_resolve: None,
            on_dispose: None,
            on_destroy: None,
            state: StateCell::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn depends_on<I>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        dedup_tokens(&mut self.dependencies);
        self
    }

    pub fn on_register<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ValueContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_register = Some(hook(f));
        self
    }

    pub fn on_resolve<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ValueContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_resolve = Some(hook(f));
        self
    }

    pub fn on_dispose<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ValueContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_dispose = Some(hook(f));
        self
    }

    pub fn on_destroy<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ValueContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_destroy = Some(hook(f));
        self
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    fn context(&self, cx: &ProviderContext) -> ValueContext<T> {
        ValueContext {
            container: cx.container.clone(),
            token: cx.token.clone(),
            dependencies: self.dependencies.clone(),
            value: self.value.clone(),
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Provider for ValueProvider<T> {
    fn token(&self) -> Token {
        self.token.clone().unwrap_or_else(Token::of::<T>)
    }

    fn dependencies(&self) -> Vec<Token> {
        self.dependencies.clone()
    }

    fn state(&self) -> ProviderState {
        self.state.get()
    }

    fn kind(&self) -> &'static str {
        "value"
    }

    async fn register(&self, cx: &ProviderContext) -> DiResult<()> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_register.as_ref(), || self.context(cx)).await?;
        self.state.set(ProviderState::Registered);
        Ok(())
    }

    async fn resolve(&self, cx: &ProviderContext) -> DiResult<AnyArc> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_resolve.as_ref(), || self.context(cx)).await?;
        self.state.set(ProviderState::Resolved);
        Ok(self.value.clone() as AnyArc)
    }

    async fn dispose(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_dispose.as_ref(), || self.context(cx)).await?;
        self.state.set(ProviderState::Disposed);
        Ok(())
    }

    async fn destroy(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_destroy.as_ref(), || self.context(cx)).await?;
        self.state.set(ProviderState::Destroyed);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ValueProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProvider")
            .field("token", &Provider::token(self))
            .field("dependencies", &self.dependencies)
            .field("state", &self.state.get())
            .finish()
    }
}
