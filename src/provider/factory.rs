//! Provider backed by an async computation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::container::Container;
use crate::error::DiResult;
use crate::lifetime::FactoryScope;
use crate::resolved::AnyArc;
use crate::token::Token;

use super::{dedup_tokens, hook, run_hook, Hook, Provider, ProviderContext, ProviderState, StateCell};

type FactoryFn<T> = Arc<dyn Fn(Container) -> BoxFuture<'static, DiResult<T>> + Send + Sync>;

/// Context passed to [`FactoryProvider`] hooks.
///
/// `value` is set for `when_resolved` and `when_disposed`.
pub struct FactoryContext<T> {
    pub container: Container,
    pub token: Token,
    pub dependencies: Vec<Token>,
    pub scope: FactoryScope,
    pub value: Option<Arc<T>>,
}

impl<T> Clone for FactoryContext<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            token: self.token.clone(),
            dependencies: self.dependencies.clone(),
            scope: self.scope,
            value: self.value.clone(),
        }
    }
}

/// Binds a token to the result of a factory.
///
/// With [`FactoryScope::Repeated`] the factory runs on every resolve; with
/// [`FactoryScope::Once`] the first value is cached until dispose. Two
/// overlapping resolves of an empty cache may both run the factory.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, FactoryProvider, FactoryScope, Resolver, ValueProvider};
///
/// struct Pool {
///     size: usize,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let container = Container::new();
/// container.register("pool.size", ValueProvider::new(4usize)).await?;
/// container
///     .register(
///         "pool",
///         FactoryProvider::new(|container: Container| async move {
///             let size = container.get::<usize>("pool.size").await?;
///             Ok(Pool { size: *size })
///         })
///         .scope(FactoryScope::Once)
///         .depends_on(["pool.size"]),
///     )
///     .await?;
///
/// let first = container.get::<Pool>("pool").await?;
/// let second = container.get::<Pool>("pool").await?;
/// assert_eq!(first.size, 4);
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// # Ok(())
/// # }
/// ```
pub struct FactoryProvider<T: Send + Sync + 'static> {
    factory: FactoryFn<T>,
    scope: FactoryScope,
    token: Option<Token>,
    dependencies: Vec<Token>,
    on_register: Option<Hook<FactoryContext<T>>>,
    on_resolve: Option<Hook<FactoryContext<T>>>,
    when_resolved: Option<Hook<FactoryContext<T>>>,
    on_dispose: Option<Hook<FactoryContext<T>>>,
    when_disposed: Option<Hook<FactoryContext<T>>>,
    on_destroy: Option<Hook<FactoryContext<T>>>,
    cached: Mutex<Option<Arc<T>>>,
    state: StateCell,
}

impl<T: Send + Sync + 'static> FactoryProvider<T> {
    /// Creates a provider from an async factory receiving the resolving container.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move |container| factory(container).boxed()),
            scope: FactoryScope::default(),
            token: None,
            dependencies: Vec::new(),
            on_register: None,
            on_resolve: None,
            when_resolved: None,
            on_dispose: None,
            when_disposed: None,
            on_destroy: None,
            cached: Mutex::new(None),
            state: StateCell::new(),
        }
    }

    /// Creates a provider from a synchronous factory.
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn(&Container) -> DiResult<T> + Send + Sync + 'static,
    {
        Self::new(move |container: Container| futures::future::ready(factory(&container)))
    }

    pub fn scope(mut self, scope: FactoryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(FactoryScope::Once)`.
    pub fn once(self) -> Self {
        self.scope(FactoryScope::Once)
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
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_register = Some(hook(f));
        self
    }

    pub fn on_resolve<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_resolve = Some(hook(f));
        self
    }

    /// Runs after the factory produced a fresh value.
    pub fn when_resolved<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.when_resolved = Some(hook(f));
        self
    }

    pub fn on_dispose<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_dispose = Some(hook(f));
        self
    }

    /// Runs when a cached value is released.
    pub fn when_disposed<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.when_disposed = Some(hook(f));
        self
    }

    pub fn on_destroy<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FactoryContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_destroy = Some(hook(f));
        self
    }

    pub fn factory_scope(&self) -> FactoryScope {
        self.scope
    }

    /// The cached value, if any.
    pub fn cached(&self) -> Option<Arc<T>> {
        self.cached.lock().clone()
    }

    fn context(&self, cx: &ProviderContext, value: Option<Arc<T>>) -> FactoryContext<T> {
        FactoryContext {
            container: cx.container.clone(),
            token: cx.token.clone(),
            dependencies: self.dependencies.clone(),
            scope: self.scope,
            value,
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Provider for FactoryProvider<T> {
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
        "factory"
    }

    async fn register(&self, cx: &ProviderContext) -> DiResult<()> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_register.as_ref(), || self.context(cx, None)).await?;
        self.state.set(ProviderState::Registered);
        Ok(())
    }

    async fn resolve(&self, cx: &ProviderContext) -> DiResult<AnyArc> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_resolve.as_ref(), || self.context(cx, None)).await?;

        let cached = self.cached.lock().clone();
        if let Some(value) = cached {
            return Ok(value as AnyArc);
        }

        tracing::trace!("running factory for {}", cx.token);
        let value = Arc::new((self.factory)(cx.container.clone()).await?);
        if self.scope == FactoryScope::Once {
            *self.cached.lock() = Some(value.clone());
        }

        run_hook(self.when_resolved.as_ref(), || self.context(cx, Some(value.clone()))).await?;
        self.state.set(ProviderState::Resolved);
        Ok(value as AnyArc)
    }

    async fn dispose(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_dispose.as_ref(), || self.context(cx, None)).await?;

        let released = self.cached.lock().take();
        if let Some(value) = released {
            run_hook(self.when_disposed.as_ref(), || self.context(cx, Some(value))).await?;
            self.state.set(ProviderState::Disposed);
        }
        Ok(())
    }

    async fn destroy(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_destroy.as_ref(), || self.context(cx, None)).await?;
        self.state.set(ProviderState::Destroyed);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for FactoryProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryProvider")
            .field("token", &Provider::token(self))
            .field("scope", &self.scope)
            .field("cached", &self.cached.lock().is_some())
            .field("state", &self.state.get())
            .finish()
    }
}
