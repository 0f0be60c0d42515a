//! Named application phases with ordered handlers.
//!
//! An [`EventPhase`] collects handlers declared by owner tokens. Invoking the
//! phase against a container runs the handlers of every owner registered in
//! that container, grouped into waves by their `before`/`after` constraints.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;

use crate::container::Container;
use crate::error::DiResult;
use crate::registry::TokenRegistry;
use crate::token::Token;
use crate::traits::Resolver;
use crate::waves::{plan_waves, run_waves, WaveEntry};

mod phases;

pub use phases::AppPhases;

type StaticFn = Arc<dyn Fn(Container) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;
type InstanceFn = Arc<dyn Fn(Container, Token) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;

#[derive(Clone)]
enum HandlerTarget {
    Static(StaticFn),
    Instance(InstanceFn),
}

/// One handler of an [`EventPhase`].
///
/// Static handlers only receive the container. Instance handlers receive the
/// owner's value, resolved from the container the phase is invoked with.
#[derive(Clone)]
pub struct PhaseHandler {
    name: String,
    before: Vec<Token>,
    after: Vec<Token>,
    target: HandlerTarget,
}

impl PhaseHandler {
    pub fn from_static<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        Self::with_target(name, HandlerTarget::Static(Arc::new(move |container| f(container).boxed())))
    }

    /// Handler bound to the owner's value, downcast to `T`.
    pub fn instance<T, F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        let f = Arc::new(f);
        let target = HandlerTarget::Instance(Arc::new(move |container: Container, owner: Token| {
            let f = f.clone();
            async move {
                let value = container.get::<T>(owner).await?;
                f(value, container).await
            }
            .boxed()
        }));
        Self::with_target(name, target)
    }

    fn with_target(name: impl Into<String>, target: HandlerTarget) -> Self {
        Self {
            name: name.into(),
            before: Vec::new(),
            after: Vec::new(),
            target,
        }
    }

    /// Owners whose handlers must run after this one.
    pub fn before<I>(mut self, owners: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.before.extend(owners.into_iter().map(Into::into));
        self
    }

    /// Owners whose handlers must run before this one.
    pub fn after<I>(mut self, owners: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.after.extend(owners.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        matches!(self.target, HandlerTarget::Static(_))
    }

    fn call(&self, container: &Container, owner: &Token) -> BoxFuture<'static, DiResult<()>> {
        tracing::trace!(owner = %owner, handler = %self.name, "running phase handler");
        match &self.target {
            HandlerTarget::Static(f) => f(container.clone()),
            HandlerTarget::Instance(f) => f(container.clone(), owner.clone()),
        }
    }
}

impl fmt::Debug for PhaseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseHandler")
            .field("name", &self.name)
            .field("static", &self.is_static())
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}

#[derive(Default)]
struct PhaseTable {
    registry: TokenRegistry,
    handlers: HashMap<Token, Vec<PhaseHandler>>,
}

/// A named phase, `event:{name}`.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, EventPhase, PhaseHandler, ValueProvider};
///
/// struct Cache;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let warmup = EventPhase::new("warmup");
/// warmup.handle(
///     "cache",
///     PhaseHandler::instance("fill", |_cache: std::sync::Arc<Cache>, _container| async { Ok(()) }),
/// );
///
/// let container = Container::new();
/// container.register("cache", ValueProvider::new(Cache)).await?;
/// warmup.invoke(&container).await?;
/// assert_eq!(warmup.name(), "event:warmup");
/// # Ok(())
/// # }
/// ```
pub struct EventPhase {
    name: String,
    table: RwLock<PhaseTable>,
}

impl EventPhase {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: format!("event:{}", name.as_ref()),
            table: RwLock::new(PhaseTable::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Token {
        Token::new(self.name.as_str())
    }

    /// Adds `handler` for `owner`. Owners keep the order of their first handler.
    pub fn handle(&self, owner: impl Into<Token>, handler: PhaseHandler) -> &Self {
        let owner = owner.into();
        let mut table = self.table.write();
        table.registry.add(owner.clone());
        table.handlers.entry(owner).or_default().push(handler);
        self
    }

    /// Drops every handler of `owner`.
    pub fn remove(&self, owner: impl Into<Token>) -> bool {
        let owner = owner.into();
        let mut table = self.table.write();
        table.handlers.remove(&owner);
        table.registry.delete(owner)
    }

    /// Owners with handlers, in declaration order.
    pub fn owners(&self) -> Vec<Token> {
        self.table.read().registry.values().cloned().collect()
    }

    pub fn handlers(&self, owner: impl Into<Token>) -> Vec<PhaseHandler> {
        self.table.read().handlers.get(&owner.into()).cloned().unwrap_or_default()
    }

    fn entries(&self, container: &Container) -> Vec<WaveEntry<PhaseHandler>> {
        let table = self.table.read();
        let mut entries = Vec::new();
        for owner in table.registry.values() {
            if !container.is_registered(owner) {
                tracing::trace!(phase = %self.name, owner = %owner, "owner not registered, skipping");
                continue;
            }
            for handler in table.handlers.get(owner).into_iter().flatten() {
                entries.push(WaveEntry {
                    owner: owner.clone(),
                    before: handler.before.clone(),
                    after: handler.after.clone(),
                    item: handler.clone(),
                });
            }
        }
        entries
    }

    /// Runs the handlers of every owner registered in `container`.
    ///
    /// Waves run one after another; handlers within a wave run concurrently.
    /// The first failing handler aborts the phase.
    pub async fn invoke(&self, container: &Container) -> DiResult<()> {
        if self.table.read().registry.is_empty() {
            return Ok(());
        }

        let waves = plan_waves(self.entries(container));
        tracing::debug!(phase = %self.name, waves = waves.len(), "invoking phase");
        run_waves(&waves, |entry| entry.item.call(container, &entry.owner)).await
    }
}

impl fmt::Debug for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPhase")
            .field("name", &self.name)
            .field("owners", &self.table.read().registry.len())
            .finish()
    }
}
