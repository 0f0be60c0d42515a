//! Declared construction metadata for [`ClassProvider`](super::ClassProvider).
//!
//! Instead of reflecting over a type, callers describe how an instance is
//! assembled: which tokens feed which constructor positions, which properties
//! are injected after construction, and which lifecycle hooks run. The
//! provider consumes these lists in order.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::resolved::AnyArc;
use crate::token::Token;

use super::Hook;

/// Produces a value for a parameter or property slot.
pub type ValueHandler = Arc<dyn Fn(Container) -> BoxFuture<'static, DiResult<AnyArc>> + Send + Sync>;

/// Stores an injected value into an instance field.
pub type PropertyAssigner<T> = Arc<dyn Fn(&mut T, AnyArc) -> DiResult<()> + Send + Sync>;

/// Wraps an async closure into a [`ValueHandler`].
pub fn value_handler<F, Fut>(f: F) -> ValueHandler
where
    F: Fn(Container) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<AnyArc>> + Send + 'static,
{
    Arc::new(move |container| f(container).boxed())
}

/// Wraps an async closure producing a concrete value into a [`ValueHandler`].
pub fn typed_handler<U, F, Fut>(f: F) -> ValueHandler
where
    U: Send + Sync + 'static,
    F: Fn(Container) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<U>> + Send + 'static,
{
    value_handler(move |container| {
        let pending = f(container);
        async move { Ok::<AnyArc, DiError>(Arc::new(pending.await?)) }
    })
}

/// Handler resolving `token` in the container performing the construction.
pub fn resolve_handler(token: Token) -> ValueHandler {
    value_handler(move |container: Container| {
        let token = token.clone();
        async move {
            let value = container.resolve(token.clone()).await?;
            value.one().cloned().ok_or_else(|| {
                DiError::type_mismatch(token.id(), "multi-bound token cannot fill a single slot")
            })
        }
    })
}

/// Explicit value for a constructor position.
#[derive(Clone)]
pub struct ParameterMetadata {
    pub index: usize,
    pub handler: ValueHandler,
}

/// Declared dependency type of a constructor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterType {
    pub token: Token,
    pub optional: bool,
}

/// Value stored in the provider's static bag before construction.
#[derive(Clone)]
pub struct StaticPropertyMetadata {
    pub key: String,
    pub handler: ValueHandler,
}

/// Value injected into an instance after construction.
pub struct PropertyMetadata<T> {
    pub key: String,
    pub handler: ValueHandler,
    pub assign: PropertyAssigner<T>,
}

impl<T> Clone for PropertyMetadata<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            handler: self.handler.clone(),
            assign: self.assign.clone(),
        }
    }
}

/// A declared lifecycle hook, named for diagnostics.
pub struct HookMetadata<C> {
    pub display_class: String,
    pub display_name: String,
    pub handler: Hook<C>,
}

impl<C> HookMetadata<C> {
    /// Hook declared on class `T` under `display_name`.
    pub fn of<T: ?Sized>(display_name: impl Into<String>, handler: Hook<C>) -> Self {
        Self {
            display_class: type_name::<T>().to_string(),
            display_name: display_name.into(),
            handler,
        }
    }

    /// `Class.name` label used in logs.
    pub fn label(&self) -> String {
        format!("{}.{}", self.display_class, self.display_name)
    }
}

impl<C> Clone for HookMetadata<C> {
    fn clone(&self) -> Self {
        Self {
            display_class: self.display_class.clone(),
            display_name: self.display_name.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> fmt::Debug for HookMetadata<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Values shared by every instance of a class provider.
#[derive(Clone, Default)]
pub struct StaticProperties {
    values: Arc<RwLock<HashMap<String, AnyArc>>>,
}

impl StaticProperties {
    pub fn get<U: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<U>> {
        let value = self.values.read().get(key).cloned()?;
        value.downcast::<U>().ok()
    }

    pub fn get_any(&self, key: &str) -> Option<AnyArc> {
        self.values.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: AnyArc) {
        self.values.write().insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }
}

impl fmt::Debug for StaticProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.read().keys()).finish()
    }
}

/// Context for register and destroy hooks.
#[derive(Clone, Debug)]
pub struct StaticContext {
    pub container: Container,
    pub token: Token,
    pub statics: StaticProperties,
}

/// Context for resolve and dispose hooks; `instance` is `None` for static hooks.
pub struct InstanceContext<T> {
    pub container: Container,
    pub token: Token,
    pub statics: StaticProperties,
    pub instance: Option<Arc<T>>,
}

impl<T> Clone for InstanceContext<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            token: self.token.clone(),
            statics: self.statics.clone(),
            instance: self.instance.clone(),
        }
    }
}

/// Everything a [`ClassProvider`](super::ClassProvider) knows about its class.
pub struct ClassMetadata<T> {
    pub dependencies: Vec<Token>,
    pub parameter_types: Vec<ParameterType>,
    pub parameters: Vec<ParameterMetadata>,
    pub static_properties: Vec<StaticPropertyMetadata>,
    pub properties: Vec<PropertyMetadata<T>>,
    pub register_hooks: Vec<HookMetadata<StaticContext>>,
    pub static_resolve_hooks: Vec<HookMetadata<InstanceContext<T>>>,
    pub resolve_hooks: Vec<HookMetadata<InstanceContext<T>>>,
    pub static_dispose_hooks: Vec<HookMetadata<InstanceContext<T>>>,
    pub dispose_hooks: Vec<HookMetadata<InstanceContext<T>>>,
    pub destroy_hooks: Vec<HookMetadata<StaticContext>>,
}

impl<T> ClassMetadata<T> {
    /// Number of constructor positions, counting overrides past the declared types.
    pub fn arity(&self) -> usize {
        let overrides = self
            .parameters
            .iter()
            .map(|parameter| parameter.index + 1)
            .max()
            .unwrap_or(0);
        overrides.max(self.parameter_types.len())
    }
}

impl<T> Default for ClassMetadata<T> {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
            parameter_types: Vec::new(),
            parameters: Vec::new(),
            static_properties: Vec::new(),
            properties: Vec::new(),
            register_hooks: Vec::new(),
            static_resolve_hooks: Vec::new(),
            resolve_hooks: Vec::new(),
            static_dispose_hooks: Vec::new(),
            dispose_hooks: Vec::new(),
            destroy_hooks: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for ClassMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("dependencies", &self.dependencies)
            .field("parameter_types", &self.parameter_types)
            .field("parameters", &self.parameters.len())
            .field("static_properties", &self.static_properties.len())
            .field("properties", &self.properties.len())
            .field("register_hooks", &self.register_hooks)
            .field("resolve_hooks", &self.resolve_hooks)
            .field("dispose_hooks", &self.dispose_hooks)
            .field("destroy_hooks", &self.destroy_hooks)
            .finish()
    }
}
