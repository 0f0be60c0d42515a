//! Teardown trait for constructed instances.

use async_trait::async_trait;

use crate::error::DiResult;

/// Asynchronous teardown of an instance built by a [`ClassProvider`](crate::ClassProvider).
///
/// Opt in with [`ClassProvider::disposable`](crate::ClassProvider::disposable):
/// every instance the provider releases on dispose is then torn down through
/// this trait, after the provider's `when_disposed` hook.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use ferrous_ioc::{AsyncDispose, ClassProvider, Container, DiResult, Resolver, Token};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Connection {
///     closed: AtomicBool,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for Connection {
///     async fn dispose(&self) -> DiResult<()> {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> DiResult<()> {
/// let container = Container::new();
/// container
///     .register_provider(ClassProvider::<Connection>::from_default().disposable())
///     .await?;
///
/// let connection = container.get_type::<Connection>().await?;
/// container.dispose(Token::of::<Connection>()).await?;
/// assert!(connection.closed.load(Ordering::SeqCst));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Releases the resources held by the instance.
    async fn dispose(&self) -> DiResult<()>;
}
