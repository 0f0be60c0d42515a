//! Provider caching policies.

/// Caching policy of a [`ClassProvider`](crate::ClassProvider).
///
/// - **Singleton**: the first resolved instance is cached and returned until
///   the provider is disposed.
/// - **Transient**: every resolve constructs a new instance. All instances
///   are retained so a later dispose can tear each of them down.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{ClassProvider, ClassScope};
///
/// #[derive(Default)]
/// struct Request;
///
/// let provider = ClassProvider::<Request>::from_default().scope(ClassScope::Transient);
/// assert_eq!(provider.class_scope(), ClassScope::Transient);
/// assert_eq!(ClassScope::default(), ClassScope::Singleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassScope {
    #[default]
    Singleton,
    Transient,
}

/// Caching policy of a [`FactoryProvider`](crate::FactoryProvider).
///
/// - **Repeated**: the factory runs on every resolve.
/// - **Once**: the first computed value is cached until dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FactoryScope {
    #[default]
    Repeated,
    Once,
}
