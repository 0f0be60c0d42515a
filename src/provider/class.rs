//! Provider constructing instances from declared dependencies.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::internal::hooks;
use crate::lifetime::ClassScope;
use crate::resolved::{AnyArc, Resolved};
use crate::token::Token;
use crate::traits::AsyncDispose;

use super::metadata::{
    resolve_handler, typed_handler, ClassMetadata, HookMetadata, InstanceContext, ParameterMetadata,
    ParameterType, PropertyAssigner, PropertyMetadata, StaticContext, StaticProperties, StaticPropertyMetadata,
};
use super::{dedup_tokens, hook, run_hook, Hook, Provider, ProviderContext, ProviderState, StateCell};

type Constructor<T> = Arc<dyn Fn(ConstructorArgs) -> DiResult<T> + Send + Sync>;
type Creator<T> = Arc<dyn Fn(Container) -> BoxFuture<'static, DiResult<T>> + Send + Sync>;

/// Positional arguments assembled for a constructor call.
///
/// Positions filled by an explicit override or by resolving a declared
/// parameter token hold a value; optional parameters whose token is not bound
/// anywhere are empty.
pub struct ConstructorArgs {
    token: Token,
    values: Vec<Option<Resolved>>,
    statics: StaticProperties,
}

impl ConstructorArgs {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// The value at `index`, downcast to `U`.
    pub fn get<U: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<U>> {
        match self.raw(index) {
            Some(value) => value.clone().downcast::<U>(&self.token),
            None => Err(DiError::type_mismatch(
                self.token.id(),
                format!("constructor argument {index} is undefined"),
            )),
        }
    }

    /// Like [`ConstructorArgs::get`] but empty positions yield `None`.
    pub fn optional<U: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<U>>> {
        self.raw(index)
            .map(|value| value.clone().downcast::<U>(&self.token))
            .transpose()
    }

    /// Every value at `index`, for positions fed by multi-bound tokens.
    pub fn all<U: Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<U>>> {
        match self.raw(index) {
            Some(value) => value.clone().downcast_all::<U>(&self.token),
            None => Ok(Vec::new()),
        }
    }

    pub fn raw(&self, index: usize) -> Option<&Resolved> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn statics(&self) -> &StaticProperties {
        &self.statics
    }
}

/// Context passed to the user hooks of a [`ClassProvider`].
pub struct ClassContext<T> {
    pub container: Container,
    pub token: Token,
    pub dependencies: Vec<Token>,
    pub scope: ClassScope,
    pub instance: Option<Arc<T>>,
}

impl<T> Clone for ClassContext<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            token: self.token.clone(),
            dependencies: self.dependencies.clone(),
            scope: self.scope,
            instance: self.instance.clone(),
        }
    }
}

/// Binds a token to instances of `T` built from declared dependencies.
///
/// Resolving a fresh instance runs, in order: static property handlers, static
/// resolve hooks, argument building (explicit overrides first, then declared
/// parameter tokens), the constructor, instance property injection, instance
/// resolve hooks. The instance is then cached per [`ClassScope`].
///
/// The provider's default token is [`Token::of::<T>()`](Token::of).
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ClassProvider, Container, Resolver, ValueProvider};
/// use std::sync::Arc;
///
/// struct Settings {
///     url: String,
/// }
///
/// struct Repository {
///     settings: Arc<Settings>,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let container = Container::new();
/// container
///     .register_provider(ValueProvider::new(Settings { url: "postgres://db".into() }))
///     .await?;
/// container
///     .register_provider(
///         ClassProvider::new(|args| Ok(Repository { settings: args.get(0)? }))
///             .parameter(ferrous_ioc::Token::of::<Settings>()),
///     )
///     .await?;
///
/// let repository = container.get_type::<Repository>().await?;
/// assert_eq!(repository.settings.url, "postgres://db");
/// # Ok(())
/// # }
/// ```
pub struct ClassProvider<T: Send + Sync + 'static> {
    constructor: Constructor<T>,
    create: Option<Creator<T>>,
    scope: ClassScope,
    token: Option<Token>,
    metadata: ClassMetadata<T>,
    on_register: Option<Hook<ClassContext<T>>>,
    on_resolve: Option<Hook<ClassContext<T>>>,
    when_resolved: Option<Hook<ClassContext<T>>>,
    on_dispose: Option<Hook<ClassContext<T>>>,
    when_disposed: Option<Hook<ClassContext<T>>>,
    on_destroy: Option<Hook<ClassContext<T>>>,
    statics: StaticProperties,
    singleton: Mutex<Option<Arc<T>>>,
    transients: Mutex<Vec<Arc<T>>>,
    state: StateCell,
}

impl<T: Send + Sync + 'static> ClassProvider<T> {
    /// Creates a provider from a constructor over the assembled arguments.
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(ConstructorArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            create: None,
            scope: ClassScope::default(),
            token: None,
            metadata: ClassMetadata::default(),
            on_register: None,
            on_resolve: None,
            when_resolved: None,
            on_dispose: None,
            when_disposed: None,
            on_destroy: None,
            statics: StaticProperties::default(),
            singleton: Mutex::new(None),
            transients: Mutex::new(Vec::new()),
            state: StateCell::new(),
        }
    }

    /// Provider constructing instances with [`Default`].
    pub fn from_default() -> Self
    where
        T: Default,
    {
        Self::new(|_| Ok(T::default()))
    }

    pub fn scope(mut self, scope: ClassScope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(ClassScope::Transient)`.
    pub fn transient(self) -> Self {
        self.scope(ClassScope::Transient)
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
        self.metadata
            .dependencies
            .extend(dependencies.into_iter().map(Into::into));
        dedup_tokens(&mut self.metadata.dependencies);
        self
    }

    /// Replaces the declared metadata wholesale.
    ///
    /// Declared parameter tokens join the dependency list.
    pub fn with_metadata(mut self, metadata: ClassMetadata<T>) -> Self {
        self.metadata = metadata;
        let parameters: Vec<Token> = self
            .metadata
            .parameter_types
            .iter()
            .map(|parameter| parameter.token.clone())
            .collect();
        self.metadata.dependencies.extend(parameters);
        dedup_tokens(&mut self.metadata.dependencies);
        self
    }

    /// Builds instances with an async routine instead of the constructor.
    ///
    /// Argument building is skipped; property injection and hooks still run.
    pub fn with_create<F, Fut>(mut self, create: F) -> Self
    where
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        self.create = Some(Arc::new(move |container| create(container).boxed()));
        self
    }

    /// Declares the next constructor position as fed by `token`.
    pub fn parameter(self, token: impl Into<Token>) -> Self {
        self.push_parameter(token.into(), false)
    }

    /// Like [`ClassProvider::parameter`], left empty when `token` is unbound.
    pub fn optional_parameter(self, token: impl Into<Token>) -> Self {
        self.push_parameter(token.into(), true)
    }

    fn push_parameter(mut self, token: Token, optional: bool) -> Self {
        self.metadata.parameter_types.push(ParameterType {
            token: token.clone(),
            optional,
        });
        self.depends_on([token])
    }

    /// Fills constructor position `index` from `handler`, taking precedence
    /// over a declared parameter token.
    pub fn with_argument<U, F, Fut>(mut self, index: usize, handler: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<U>> + Send + 'static,
    {
        self.metadata.parameters.push(ParameterMetadata {
            index,
            handler: typed_handler(handler),
        });
        self
    }

    /// Stores the result of `handler` in the static bag under `key`.
    pub fn static_property<U, F, Fut>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<U>> + Send + 'static,
    {
        self.metadata.static_properties.push(StaticPropertyMetadata {
            key: key.into(),
            handler: typed_handler(handler),
        });
        self
    }

    /// Stores the value bound to `token` in the static bag under `key`.
    pub fn inject_static(mut self, key: impl Into<String>, token: impl Into<Token>) -> Self {
        let token = token.into();
        self.metadata.static_properties.push(StaticPropertyMetadata {
            key: key.into(),
            handler: resolve_handler(token.clone()),
        });
        self.depends_on([token])
    }

    /// Injects the result of `handler` into each new instance.
    pub fn property<U, F, Fut, A>(mut self, key: impl Into<String>, handler: F, assign: A) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn(Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<U>> + Send + 'static,
        A: Fn(&mut T, Arc<U>) + Send + Sync + 'static,
    {
        let key = key.into();
        self.metadata.properties.push(PropertyMetadata {
            key: key.clone(),
            handler: typed_handler(handler),
            assign: typed_assigner(key, assign),
        });
        self
    }

    /// Injects the value bound to `token` into each new instance.
    pub fn inject<U, A>(mut self, key: impl Into<String>, token: impl Into<Token>, assign: A) -> Self
    where
        U: Send + Sync + 'static,
        A: Fn(&mut T, Arc<U>) + Send + Sync + 'static,
    {
        let key = key.into();
        let token = token.into();
        self.metadata.properties.push(PropertyMetadata {
            key: key.clone(),
            handler: resolve_handler(token.clone()),
            assign: typed_assigner(key, assign),
        });
        self.depends_on([token])
    }

    pub fn on_register<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_register = Some(hook(f));
        self
    }

    pub fn on_resolve<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_resolve = Some(hook(f));
        self
    }

    /// Runs after a fresh instance was constructed and cached.
    pub fn when_resolved<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.when_resolved = Some(hook(f));
        self
    }

    pub fn on_dispose<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_dispose = Some(hook(f));
        self
    }

    /// Runs once per released instance.
    pub fn when_disposed<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.when_disposed = Some(hook(f));
        self
    }

    pub fn on_destroy<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ClassContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.on_destroy = Some(hook(f));
        self
    }

    /// Declares a one-time registration hook.
    pub fn register_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StaticContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.register_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    /// Declares a hook run before construction of each fresh instance.
    pub fn static_resolve_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(InstanceContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.static_resolve_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    /// Declares a hook run on each fresh instance after property injection.
    pub fn resolve_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(InstanceContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.resolve_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    /// Declares a hook run once per dispose, before instances are released.
    pub fn static_dispose_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(InstanceContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.static_dispose_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    /// Declares a teardown hook run for every released instance.
    pub fn dispose_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(InstanceContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.dispose_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    pub fn destroy_hook<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StaticContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.metadata.destroy_hooks.push(HookMetadata::of::<T>(name, hook(f)));
        self
    }

    /// Runs [`AsyncDispose::dispose`] on every released instance.
    pub fn disposable(self) -> Self
    where
        T: AsyncDispose,
    {
        self.dispose_hook("dispose", |context: InstanceContext<T>| async move {
            match context.instance {
                Some(instance) => instance.dispose().await,
                None => Ok(()),
            }
        })
    }

    pub fn class_scope(&self) -> ClassScope {
        self.scope
    }

    pub fn metadata(&self) -> &ClassMetadata<T> {
        &self.metadata
    }

    pub fn statics(&self) -> &StaticProperties {
        &self.statics
    }

    /// Number of instances currently retained for disposal.
    pub fn instance_count(&self) -> usize {
        usize::from(self.singleton.lock().is_some()) + self.transients.lock().len()
    }

    fn context(&self, cx: &ProviderContext, instance: Option<Arc<T>>) -> ClassContext<T> {
        ClassContext {
            container: cx.container.clone(),
            token: cx.token.clone(),
            dependencies: self.metadata.dependencies.clone(),
            scope: self.scope,
            instance,
        }
    }

    fn static_context(&self, cx: &ProviderContext) -> StaticContext {
        StaticContext {
            container: cx.container.clone(),
            token: cx.token.clone(),
            statics: self.statics.clone(),
        }
    }

    fn instance_context(&self, cx: &ProviderContext, instance: Option<Arc<T>>) -> InstanceContext<T> {
        InstanceContext {
            container: cx.container.clone(),
            token: cx.token.clone(),
            statics: self.statics.clone(),
            instance,
        }
    }

    async fn construct(&self, cx: &ProviderContext) -> DiResult<Arc<T>> {
        let container = &cx.container;
        tracing::trace!("constructing {} for {}", type_name::<T>(), cx.token);

        let statics = try_join_all(
            self.metadata
                .static_properties
                .iter()
                .map(|property| (property.handler)(container.clone())),
        )
        .await?;
        for (property, value) in self.metadata.static_properties.iter().zip(statics) {
            self.statics.set(property.key.clone(), value);
        }

        hooks::run_all(&self.metadata.static_resolve_hooks, self.instance_context(cx, None)).await?;

        let mut instance = match &self.create {
            Some(create) => create(container.clone()).await?,
            None => {
                let args = self.build_arguments(cx).await?;
                (self.constructor)(args)?
            }
        };

        let values = try_join_all(
            self.metadata
                .properties
                .iter()
                .map(|property| (property.handler)(container.clone())),
        )
        .await?;
        for (property, value) in self.metadata.properties.iter().zip(values) {
            (property.assign)(&mut instance, value)?;
        }

        let instance = Arc::new(instance);
        hooks::run_all(
            &self.metadata.resolve_hooks,
            self.instance_context(cx, Some(instance.clone())),
        )
        .await?;
        Ok(instance)
    }

    async fn build_arguments(&self, cx: &ProviderContext) -> DiResult<ConstructorArgs> {
        let container = &cx.container;
        let mut values: Vec<Option<Resolved>> = vec![None; self.metadata.arity()];

        let overrides = try_join_all(self.metadata.parameters.iter().map(|parameter| async move {
            let value = (parameter.handler)(container.clone()).await?;
            Ok::<_, DiError>((parameter.index, value))
        }))
        .await?;
        for (index, value) in overrides {
            values[index] = Some(Resolved::One(value));
        }

        let pending: Vec<(usize, &ParameterType)> = self
            .metadata
            .parameter_types
            .iter()
            .enumerate()
            .filter(|(index, _)| values[*index].is_none())
            .collect();
        let resolved = try_join_all(pending.into_iter().map(|(index, parameter)| async move {
            match container.try_resolve(parameter.token.clone()).await? {
                Some(value) => Ok((index, Some(value))),
                None if parameter.optional => Ok((index, None)),
                None => Err(DiError::UnregisteredToken(parameter.token.id().to_string())),
            }
        }))
        .await?;
        for (index, value) in resolved {
            values[index] = value;
        }

        Ok(ConstructorArgs {
            token: cx.token.clone(),
            values,
            statics: self.statics.clone(),
        })
    }
}

fn typed_assigner<T, U, A>(key: String, assign: A) -> PropertyAssigner<T>
where
    T: 'static,
    U: Send + Sync + 'static,
    A: Fn(&mut T, Arc<U>) + Send + Sync + 'static,
{
    Arc::new(move |instance: &mut T, value: AnyArc| {
        let value = value.downcast::<U>().map_err(|_| {
            DiError::type_mismatch(&key, format!("property value is not a {}", type_name::<U>()))
        })?;
        assign(instance, value);
        Ok(())
    })
}

#[async_trait]
impl<T: Send + Sync + 'static> Provider for ClassProvider<T> {
    fn token(&self) -> Token {
        self.token.clone().unwrap_or_else(Token::of::<T>)
    }

    fn dependencies(&self) -> Vec<Token> {
        let mut dependencies = self.metadata.dependencies.clone();
        dependencies.extend(
            self.metadata
                .parameter_types
                .iter()
                .map(|parameter| parameter.token.clone()),
        );
        dedup_tokens(&mut dependencies);
        dependencies
    }

    fn state(&self) -> ProviderState {
        self.state.get()
    }

    fn kind(&self) -> &'static str {
        "class"
    }

    async fn register(&self, cx: &ProviderContext) -> DiResult<()> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_register.as_ref(), || self.context(cx, None)).await?;
        hooks::run_all(&self.metadata.register_hooks, self.static_context(cx)).await?;
        self.state.set(ProviderState::Registered);
        Ok(())
    }

    async fn resolve(&self, cx: &ProviderContext) -> DiResult<AnyArc> {
        self.state.ensure_live(&cx.token)?;
        run_hook(self.on_resolve.as_ref(), || self.context(cx, None)).await?;

        let cached = self.singleton.lock().clone();
        if let Some(instance) = cached {
            return Ok(instance as AnyArc);
        }

        let instance = self.construct(cx).await?;
        match self.scope {
            ClassScope::Singleton => *self.singleton.lock() = Some(instance.clone()),
            ClassScope::Transient => self.transients.lock().push(instance.clone()),
        }

        run_hook(self.when_resolved.as_ref(), || self.context(cx, Some(instance.clone()))).await?;
        self.state.set(ProviderState::Resolved);
        Ok(instance as AnyArc)
    }

    async fn dispose(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_dispose.as_ref(), || self.context(cx, None)).await?;
        hooks::run_all(&self.metadata.static_dispose_hooks, self.instance_context(cx, None)).await?;

        let singleton = self.singleton.lock().take();
        let transients = std::mem::take(&mut *self.transients.lock());
        let released: Vec<Arc<T>> = singleton.into_iter().chain(transients).collect();
        if released.is_empty() {
            return Ok(());
        }

        tracing::trace!("releasing {} instance(s) of {}", released.len(), cx.token);
        for instance in released {
            run_hook(self.when_disposed.as_ref(), || self.context(cx, Some(instance.clone()))).await?;
            hooks::run_all(
                &self.metadata.dispose_hooks,
                self.instance_context(cx, Some(instance)),
            )
            .await?;
        }
        self.state.set(ProviderState::Disposed);
        Ok(())
    }

    async fn destroy(&self, cx: &ProviderContext) -> DiResult<()> {
        run_hook(self.on_destroy.as_ref(), || self.context(cx, None)).await?;
        hooks::run_all(&self.metadata.destroy_hooks, self.static_context(cx)).await?;
        self.state.set(ProviderState::Destroyed);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ClassProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassProvider")
            .field("class", &type_name::<T>())
            .field("token", &Provider::token(self))
            .field("scope", &self.scope)
            .field("metadata", &self.metadata)
            .field("instances", &self.instance_count())
            .field("state", &self.state.get())
            .finish()
    }
}
