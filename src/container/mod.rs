//! Hierarchical container.
//!
//! A [`Container`] owns a binding table, its child scopes and an event
//! emitter. Lookups search the local table first and then walk the parent
//! chain, so bindings in a scope shadow those of its ancestors while siblings
//! stay invisible to each other.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::internal::circular::{self, VisitPath};
use crate::observer::{
    BootstrapEvent, ContainerEvent, DestroyEvent, DestroyedEvent, DisposeEvent, DisposedEvent, Emitter,
    Observer, RegisterEvent, RegisteredEvent, ResolveEvent, ResolvedEvent, Subscription,
};
use crate::provider::{Provider, ProviderContext};
use crate::resolved::{AnyArc, Resolved};
use crate::token::Token;
use crate::traits::ResolverCore;

mod store;

pub use store::Pointer;
use store::Store;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Hierarchical registry and resolver.
///
/// `Container` is a cheap handle; clones refer to the same container. A
/// container owns its children, while a child only keeps a weak link to its
/// parent for lookups and detachment.
///
/// No lock is held across an `.await`. Concurrent calls against the same
/// token are not serialized: two overlapping resolves of an uncached
/// singleton may both construct it.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Resolver, ValueProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let root = Container::new();
/// root.register("greeting", ValueProvider::new("hello")).await?;
///
/// let scope = root.create_scope();
/// scope.register("greeting", ValueProvider::new("hi")).await?;
///
/// assert_eq!(*root.get::<&str>("greeting").await?, "hello");
/// assert_eq!(*scope.get::<&str>("greeting").await?, "hi");
///
/// root.destroy_all().await?;
/// assert!(root.tokens().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    id: u64,
    store: RwLock<Store>,
    parent: RwLock<Weak<ContainerInner>>,
    children: RwLock<Vec<Container>>,
    emitter: Emitter,
}

/// What to produce when a token is bound nowhere in the scope chain.
enum Fallback {
    Fail,
    Absent,
    Values(Vec<AnyArc>),
}

impl Fallback {
    fn apply(&self, token: &Token) -> DiResult<Option<Resolved>> {
        match self {
            Fallback::Fail => Err(DiError::UnregisteredToken(token.id().to_string())),
            Fallback::Absent => Ok(None),
            Fallback::Values(values) => match values.as_slice() {
                [] => Err(DiError::UnregisteredToken(token.id().to_string())),
                [value] => Ok(Some(Resolved::One(value.clone()))),
                values => Ok(Some(Resolved::Many(
                    values.iter().cloned().map(Resolved::One).collect(),
                ))),
            },
        }
    }
}

impl Container {
    /// Creates a root container.
    pub fn new() -> Self {
        Self::with_parent(Weak::new())
    }

    fn with_parent(parent: Weak<ContainerInner>) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
                store: RwLock::new(Store::default()),
                parent: RwLock::new(parent),
                children: RwLock::new(Vec::new()),
                emitter: Emitter::new(),
            }),
        }
    }

    /// Process-unique id, used in logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// True when both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates a child scope inheriting this container's bindings for lookup.
    pub fn create_scope(&self) -> Container {
        let child = Self::with_parent(Arc::downgrade(&self.inner));
        self.inner.children.write().push(child.clone());
        tracing::debug!(parent = self.id(), child = child.id(), "created scope");
        child
    }

    pub fn parent(&self) -> Option<Container> {
        self.inner.parent.read().upgrade().map(|inner| Container { inner })
    }

    pub fn children(&self) -> Vec<Container> {
        self.inner.children.read().clone()
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// The event emitter of this container.
    pub fn events(&self) -> &Emitter {
        &self.inner.emitter
    }

    /// Subscribes `observer`'s callbacks for events about `token`.
    pub fn observe(&self, token: impl Into<Token>, observer: Observer) -> Subscription {
        self.inner.emitter.observe(token, observer)
    }

    async fn emit(&self, event: impl Into<ContainerEvent>) -> DiResult<()> {
        self.inner.emitter.emit(event.into()).await
    }

    /// Emits the bootstrap event. Call once at startup.
    #[doc(alias = "boostrap")]
    pub async fn bootstrap(&self) -> DiResult<()> {
        tracing::debug!(container = self.id(), "bootstrapping container");
        self.emit(BootstrapEvent {
            container: self.clone(),
            subscription: None,
        })
        .await
    }

    /// Tokens bound in this container, in binding order.
    pub fn tokens(&self) -> Vec<Token> {
        self.inner.store.read().tokens()
    }

    /// The local pointer for `token`, ignoring ancestors.
    pub fn pointer(&self, token: impl Into<Token>) -> Option<Pointer> {
        self.local_pointer(&token.into())
    }

    fn local_pointer(&self, token: &Token) -> Option<Pointer> {
        self.inner.store.read().get_token(token).cloned()
    }

    /// True when `token` leads to at least one provider from this container.
    pub fn is_registered(&self, token: impl Into<Token>) -> bool {
        self.is_registered_inner(&token.into())
    }

    fn is_registered_inner(&self, token: &Token) -> bool {
        match self.local_pointer(token) {
            Some(Pointer::SingleProvider(_)) | Some(Pointer::ProviderList(_)) => true,
            Some(Pointer::SingleAlias(target)) => self.is_registered_inner(&target),
            Some(Pointer::AliasList(targets)) => targets.iter().any(|target| self.is_registered_inner(target)),
            None => self.parent().is_some_and(|parent| parent.is_registered_inner(token)),
        }
    }

    /// True when `token` is an alias pointing at any of `targets`.
    pub fn is_mapped<I>(&self, token: impl Into<Token>, targets: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        let targets: Vec<Token> = targets.into_iter().map(Into::into).collect();
        self.is_mapped_inner(&token.into(), &targets)
    }

    fn is_mapped_inner(&self, token: &Token, targets: &[Token]) -> bool {
        if let Some(bound) = self.local_pointer(token).and_then(|pointer| pointer.targets()) {
            return bound.iter().any(|target| targets.contains(target));
        }
        self.parent().is_some_and(|parent| parent.is_mapped_inner(token, targets))
    }

    /// Binds `token` to `provider`.
    ///
    /// Emits `register`, rejects tokens already bound in this container,
    /// installs the provider, checks for dependency cycles, runs the
    /// provider's registration and finally emits `registered`. A failed cycle
    /// check or registration leaves the token unbound.
    pub async fn register<P: Provider>(&self, token: impl Into<Token>, provider: P) -> DiResult<()> {
        self.register_shared(token, Arc::new(provider)).await
    }

    /// Binds `provider` under its own token.
    pub async fn register_provider<P: Provider>(&self, provider: P) -> DiResult<()> {
        let token = provider.token();
        self.register_shared(token, Arc::new(provider)).await
    }

    /// Binds an already shared provider.
    pub async fn register_shared(&self, token: impl Into<Token>, provider: Arc<dyn Provider>) -> DiResult<()> {
        let token = token.into();
        self.emit(RegisterEvent {
            container: self.clone(),
            token: token.clone(),
            subscription: None,
        })
        .await?;

        {
            let mut store = self.inner.store.write();
            if store.has_token(&token) {
                return Err(DiError::DuplicateBinding(token.id().to_string()));
            }
            store.set_token(token.clone(), Pointer::SingleProvider(provider.clone()));
        }

        let installed = self.complete_registration(&token, &provider).await;
        if let Err(error) = installed {
            self.inner.store.write().remove_token(&token);
            return Err(error);
        }

        tracing::debug!(container = self.id(), "registered {} ({})", token, provider.kind());
        Ok(())
    }

    /// Appends `providers` to the multi-binding of `token`.
    ///
    /// Creates the list when the token is unbound here. Fails with
    /// [`DiError::MissingProvider`] for an empty slice, with
    /// [`DiError::DuplicateBinding`] if the token holds a single provider and
    /// with [`DiError::TypeMismatch`] if it is an alias. Providers that fail
    /// their cycle check or registration are removed from the list again.
    pub async fn register_many(&self, token: impl Into<Token>, providers: Vec<Arc<dyn Provider>>) -> DiResult<()> {
        let token = token.into();
        self.emit(RegisterEvent {
            container: self.clone(),
            token: token.clone(),
            subscription: None,
        })
        .await?;

        if providers.is_empty() {
            return Err(DiError::MissingProvider(token.id().to_string()));
        }

        {
            let mut store = self.inner.store.write();
            match store.get_token_mut(&token) {
                None => store.set_token(token.clone(), Pointer::ProviderList(providers.clone())),
                Some(Pointer::ProviderList(list)) => list.extend(providers.iter().cloned()),
                Some(Pointer::SingleProvider(_)) => {
                    return Err(DiError::DuplicateBinding(token.id().to_string()));
                }
                Some(pointer) => {
                    return Err(DiError::type_mismatch(
                        token.id(),
                        format!("cannot add providers to {}", pointer.describe()),
                    ));
                }
            }
        }

        for (index, provider) in providers.iter().enumerate() {
            if let Err(error) = self.complete_registration(&token, provider).await {
                self.inner.store.write().retract_providers(&token, &providers[index..]);
                return Err(error);
            }
        }

        tracing::debug!(container = self.id(), "registered {} provider(s) for {}", providers.len(), token);
        Ok(())
    }

    async fn complete_registration(&self, token: &Token, provider: &Arc<dyn Provider>) -> DiResult<()> {
        if let Err(error) =
            circular::check_dependencies(self, token, &provider.dependencies(), VisitPath::default())
        {
            tracing::warn!(container = self.id(), "rejected registration of {}: {}", token, error);
            return Err(error);
        }

        provider
            .register(&ProviderContext::new(self.clone(), token.clone()))
            .await?;

        self.emit(RegisteredEvent {
            container: self.clone(),
            token: token.clone(),
            provider: provider.clone(),
            subscription: None,
        })
        .await
    }

    /// Makes `token` an alias of `target`.
    ///
    /// Fails if the token is already bound here or if the alias would close
    /// an alias cycle, in which case the token stays unbound.
    pub fn map(&self, token: impl Into<Token>, target: impl Into<Token>) -> DiResult<()> {
        let token = token.into();
        let target = target.into();
        {
            let mut store = self.inner.store.write();
            if store.has_token(&token) {
                return Err(DiError::DuplicateBinding(token.id().to_string()));
            }
            store.set_token(token.clone(), Pointer::SingleAlias(target.clone()));
        }

        if let Err(error) = circular::check_mapping(self, &token, VisitPath::default()) {
            tracing::warn!(container = self.id(), "rejected mapping of {}: {}", token, error);
            self.inner.store.write().remove_token(&token);
            return Err(error);
        }

        tracing::debug!(container = self.id(), "mapped {} -> {}", token, target);
        Ok(())
    }

    /// Appends `targets` to the fan-out alias list of `token`.
    ///
    /// Fails with [`DiError::DuplicateBinding`] if the token is a single
    /// alias, [`DiError::TypeMismatch`] if it is bound to providers, and
    /// restores the previous list when the extension closes an alias cycle.
    pub fn map_many<I>(&self, token: impl Into<Token>, targets: I) -> DiResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        let token = token.into();
        let targets: Vec<Token> = targets.into_iter().map(Into::into).collect();
        let previous = {
            let mut store = self.inner.store.write();
            match store.get_token_mut(&token) {
                None => {
                    store.set_token(token.clone(), Pointer::AliasList(targets.clone()));
                    None
                }
                Some(Pointer::AliasList(list)) => {
                    let previous = list.len();
                    list.extend(targets.iter().cloned());
                    Some(previous)
                }
                Some(Pointer::SingleAlias(_)) => {
                    return Err(DiError::DuplicateBinding(token.id().to_string()));
                }
                Some(pointer) => {
                    return Err(DiError::type_mismatch(
                        token.id(),
                        format!("cannot add aliases to {}", pointer.describe()),
                    ));
                }
            }
        };

        if let Err(error) = circular::check_mapping(self, &token, VisitPath::default()) {
            tracing::warn!(container = self.id(), "rejected mapping of {}: {}", token, error);
            let mut store = self.inner.store.write();
            match previous {
                Some(length) => {
                    if let Some(Pointer::AliasList(list)) = store.get_token_mut(&token) {
                        list.truncate(length);
                    }
                }
                None => {
                    store.remove_token(&token);
                }
            }
            return Err(error);
        }

        tracing::debug!(container = self.id(), "mapped {} -> {:?}", token, targets);
        Ok(())
    }

    /// The provider bound to `token`, following aliases and the parent chain.
    ///
    /// Fails with [`DiError::UnregisteredToken`] when nothing is bound and with
    /// [`DiError::TypeMismatch`] when the token leads to several providers.
    pub fn use_provider(&self, token: impl Into<Token>) -> DiResult<Arc<dyn Provider>> {
        let token = token.into();
        self.find_provider(&token)?
            .ok_or_else(|| DiError::UnregisteredToken(token.id().to_string()))
    }

    /// Like [`Container::use_provider`] but returns `fallback` when unbound.
    pub fn use_or(&self, token: impl Into<Token>, fallback: Arc<dyn Provider>) -> DiResult<Arc<dyn Provider>> {
        Ok(self.find_provider(&token.into())?.unwrap_or(fallback))
    }

    /// Like [`Container::use_or`] with several fallbacks.
    ///
    /// A bound token yields its single provider; an unbound token yields
    /// `fallbacks`, or fails like [`Container::use_provider`] when they are empty.
    pub fn use_or_many<I>(&self, token: impl Into<Token>, fallbacks: I) -> DiResult<Vec<Arc<dyn Provider>>>
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        let token = token.into();
        if let Some(provider) = self.find_provider(&token)? {
            return Ok(vec![provider]);
        }
        let fallbacks: Vec<Arc<dyn Provider>> = fallbacks.into_iter().collect();
        if fallbacks.is_empty() {
            return Err(DiError::UnregisteredToken(token.id().to_string()));
        }
        Ok(fallbacks)
    }

    /// Like [`Container::use_provider`] but returns `None` when unbound.
    pub fn try_use(&self, token: impl Into<Token>) -> DiResult<Option<Arc<dyn Provider>>> {
        self.find_provider(&token.into())
    }

    /// Every provider `token` leads to, in binding order.
    pub fn use_many(&self, token: impl Into<Token>) -> DiResult<Vec<Arc<dyn Provider>>> {
        let token = token.into();
        let providers: Vec<Arc<dyn Provider>> = self
            .visible_providers(&token)
            .into_iter()
            .map(|(_, provider)| provider)
            .collect();
        if providers.is_empty() && !self.is_registered_inner(&token) {
            return Err(DiError::UnregisteredToken(token.id().to_string()));
        }
        Ok(providers)
    }

    fn find_provider(&self, token: &Token) -> DiResult<Option<Arc<dyn Provider>>> {
        match self.local_pointer(token) {
            Some(Pointer::SingleProvider(provider)) => Ok(Some(provider)),
            Some(Pointer::SingleAlias(target)) => self.find_provider(&target),
            Some(pointer) => Err(DiError::type_mismatch(
                token.id(),
                format!("token is bound to {}", pointer.describe()),
            )),
            None => match self.parent() {
                Some(parent) => parent.find_provider(token),
                None => Ok(None),
            },
        }
    }

    /// Providers reachable from `token`, each paired with the container whose
    /// table holds it. Never fails.
    pub(crate) fn visible_providers(&self, token: &Token) -> Vec<(Container, Arc<dyn Provider>)> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        self.collect_providers(token, &mut seen, &mut found);
        found
    }

    fn collect_providers(
        &self,
        token: &Token,
        seen: &mut HashSet<(u64, Token)>,
        found: &mut Vec<(Container, Arc<dyn Provider>)>,
    ) {
        if !seen.insert((self.id(), token.clone())) {
            return;
        }
        match self.local_pointer(token) {
            Some(Pointer::SingleProvider(provider)) => found.push((self.clone(), provider)),
            Some(Pointer::ProviderList(providers)) => {
                found.extend(providers.into_iter().map(|provider| (self.clone(), provider)));
            }
            Some(Pointer::SingleAlias(target)) => self.collect_providers(&target, seen, found),
            Some(Pointer::AliasList(targets)) => {
                for target in &targets {
                    self.collect_providers(target, seen, found);
                }
            }
            None => {
                if let Some(parent) = self.parent() {
                    parent.collect_providers(token, seen, found);
                }
            }
        }
    }

    /// Alias targets of `token` from the nearest container binding it,
    /// together with that container.
    pub(crate) fn visible_targets(&self, token: &Token) -> Option<(Container, Vec<Token>)> {
        match self.local_pointer(token) {
            Some(pointer) => pointer.targets().map(|targets| (self.clone(), targets)),
            None => self.parent()?.visible_targets(token),
        }
    }

    /// Resolves `token` to its value(s).
    ///
    /// Emits `resolve`, then follows the binding: a single provider yields
    /// [`Resolved::One`]; provider lists resolve concurrently into
    /// [`Resolved::Many`]; aliases resolve their targets from this container;
    /// unbound tokens are looked up in the parent. Each leaf provider emits
    /// `resolved` with its value.
    pub async fn resolve(&self, token: impl Into<Token>) -> DiResult<Resolved> {
        let token = token.into();
        match self.resolve_inner(token.clone(), &Fallback::Fail).await? {
            Some(resolved) => Ok(resolved),
            None => Err(DiError::UnregisteredToken(token.id().to_string())),
        }
    }

    /// Resolves `token`, producing `fallback` when it is bound nowhere.
    ///
    /// A single fallback value yields [`Resolved::One`], several yield
    /// [`Resolved::Many`]; an empty fallback behaves like [`Container::resolve`].
    pub async fn resolve_or<I>(&self, token: impl Into<Token>, fallback: I) -> DiResult<Resolved>
    where
        I: IntoIterator<Item = AnyArc>,
    {
        let token = token.into();
        let fallback = Fallback::Values(fallback.into_iter().collect());
        match self.resolve_inner(token.clone(), &fallback).await? {
            Some(resolved) => Ok(resolved),
            None => Err(DiError::UnregisteredToken(token.id().to_string())),
        }
    }

    /// Resolves `token`, yielding `None` when it is bound nowhere.
    ///
    /// Fan-out targets that are bound nowhere are left out of the list.
    pub async fn try_resolve(&self, token: impl Into<Token>) -> DiResult<Option<Resolved>> {
        self.resolve_inner(token.into(), &Fallback::Absent).await
    }

    fn resolve_inner<'a>(&'a self, token: Token, fallback: &'a Fallback) -> BoxFuture<'a, DiResult<Option<Resolved>>> {
        async move {
            self.emit(ResolveEvent {
                container: self.clone(),
                token: token.clone(),
                subscription: None,
            })
            .await?;

            let pointer = self.local_pointer(&token);
            match pointer {
                Some(Pointer::SingleProvider(provider)) => {
                    let value = self.resolve_leaf(&token, provider).await?;
                    Ok(Some(Resolved::One(value)))
                }
                Some(Pointer::ProviderList(providers)) => {
                    let values = try_join_all(
                        providers
                            .into_iter()
                            .map(|provider| self.resolve_leaf(&token, provider)),
                    )
                    .await?;
                    Ok(Some(Resolved::Many(values.into_iter().map(Resolved::One).collect())))
                }
                Some(Pointer::SingleAlias(target)) => self.resolve_inner(target, fallback).await,
                Some(Pointer::AliasList(targets)) => {
                    let values = try_join_all(
                        targets
                            .into_iter()
                            .map(|target| self.resolve_inner(target, fallback)),
                    )
                    .await?;
                    Ok(Some(Resolved::Many(values.into_iter().flatten().collect())))
                }
                None => match self.parent() {
                    Some(parent) => parent.resolve_inner(token, fallback).await,
                    None => fallback.apply(&token),
                },
            }
        }
        .boxed()
    }

    async fn resolve_leaf(&self, token: &Token, provider: Arc<dyn Provider>) -> DiResult<AnyArc> {
        tracing::trace!(container = self.id(), "resolving {}", token);
        let value = provider
            .resolve(&ProviderContext::new(self.clone(), token.clone()))
            .await?;

        self.emit(ResolvedEvent {
            container: self.clone(),
            token: token.clone(),
            provider,
            value: value.clone(),
            subscription: None,
        })
        .await?;
        Ok(value)
    }

    /// Disposes every provider `token` leads to, here and up the parent chain.
    ///
    /// Providers stay registered and can be resolved again. Disposal is not
    /// scope-isolated: the parent's binding of the same token is disposed too.
    pub async fn dispose(&self, token: impl Into<Token>) -> DiResult<()> {
        self.dispose_inner(token.into()).await
    }

    fn dispose_inner(&self, token: Token) -> BoxFuture<'_, DiResult<()>> {
        async move {
            self.emit(DisposeEvent {
                container: self.clone(),
                token: token.clone(),
                subscription: None,
            })
            .await?;

            match self.local_pointer(&token) {
                Some(pointer) if pointer.is_provider() => {
                    let providers = pointer.providers().unwrap_or_default();
                    try_join_all(providers.into_iter().map(|provider| self.dispose_leaf(&token, provider))).await?;
                }
                Some(pointer) => {
                    let targets = pointer.targets().unwrap_or_default();
                    try_join_all(targets.into_iter().map(|target| self.dispose_inner(target))).await?;
                }
                None => {}
            }

            if let Some(parent) = self.parent() {
                parent.dispose_inner(token).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn dispose_leaf(&self, token: &Token, provider: Arc<dyn Provider>) -> DiResult<()> {
        provider
            .dispose(&ProviderContext::new(self.clone(), token.clone()))
            .await?;
        tracing::trace!(container = self.id(), "disposed {}", token);

        self.emit(DisposedEvent {
            container: self.clone(),
            token: token.clone(),
            provider,
            subscription: None,
        })
        .await
    }

    /// Destroys every provider `token` leads to and removes the local binding.
    ///
    /// Cascades through aliases and up the parent chain like
    /// [`Container::dispose`]; each container removes its own binding.
    pub async fn destroy(&self, token: impl Into<Token>) -> DiResult<()> {
        self.destroy_inner(token.into()).await
    }

    fn destroy_inner(&self, token: Token) -> BoxFuture<'_, DiResult<()>> {
        async move {
            self.emit(DestroyEvent {
                container: self.clone(),
                token: token.clone(),
                subscription: None,
            })
            .await?;

            let pointer = self.local_pointer(&token);
            match &pointer {
                Some(pointer) if pointer.is_provider() => {
                    let providers = pointer.providers().unwrap_or_default();
                    try_join_all(providers.into_iter().map(|provider| self.destroy_leaf(&token, provider))).await?;
                }
                Some(pointer) => {
                    let targets = pointer.targets().unwrap_or_default();
                    try_join_all(targets.into_iter().map(|target| self.destroy_inner(target))).await?;
                }
                None => {}
            }

            if pointer.is_some() {
                self.inner.store.write().remove_token(&token);
                tracing::debug!(container = self.id(), "destroyed {}", token);
            }

            if let Some(parent) = self.parent() {
                parent.destroy_inner(token).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn destroy_leaf(&self, token: &Token, provider: Arc<dyn Provider>) -> DiResult<()> {
        provider
            .destroy(&ProviderContext::new(self.clone(), token.clone()))
            .await?;

        self.emit(DestroyedEvent {
            container: self.clone(),
            token: token.clone(),
            provider,
            subscription: None,
        })
        .await
    }

    /// Disposes every local token in binding order, then every child scope
    /// concurrently.
    pub async fn dispose_all(&self) -> DiResult<()> {
        self.dispose_all_inner().await
    }

    fn dispose_all_inner(&self) -> BoxFuture<'_, DiResult<()>> {
        async move {
            for token in self.tokens() {
                self.dispose_inner(token).await?;
            }

            let children = self.children();
            try_join_all(children.iter().map(|child| child.dispose_all_inner())).await?;
            Ok(())
        }
        .boxed()
    }

    /// Tears the container down.
    ///
    /// Disposes everything, destroys every local token, detaches from the
    /// parent, destroys every child scope concurrently and clears the table.
    pub async fn destroy_all(&self) -> DiResult<()> {
        self.destroy_all_inner().await
    }

    fn destroy_all_inner(&self) -> BoxFuture<'_, DiResult<()>> {
        async move {
            tracing::debug!(container = self.id(), "destroying container");
            self.dispose_all_inner().await?;

            for token in self.tokens() {
                self.destroy_inner(token).await?;
            }

            self.detach();

            let children = self.children();
            try_join_all(children.iter().map(|child| child.destroy_all_inner())).await?;

            self.inner.store.write().clear();
            Ok(())
        }
        .boxed()
    }

    /// Unlinks this container from its parent in both directions.
    fn detach(&self) {
        let parent = std::mem::take(&mut *self.inner.parent.write()).upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .write()
                .retain(|child| !Arc::ptr_eq(&child.inner, &self.inner));
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverCore for Container {
    fn resolve_token(&self, token: Token) -> BoxFuture<'_, DiResult<Resolved>> {
        self.resolve(token).boxed()
    }

    fn try_resolve_token(&self, token: Token) -> BoxFuture<'_, DiResult<Option<Resolved>>> {
        self.try_resolve(token).boxed()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.inner.store.read();
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("parent", &self.parent().map(|parent| parent.id()))
            .field("children", &self.inner.children.read().len())
            .field("bindings", &store.len())
            .finish()
    }
}
