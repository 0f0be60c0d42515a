//! Resolver traits for typed resolution.

use std::any::type_name;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{DiError, DiResult};
use crate::resolved::Resolved;
use crate::token::Token;

/// Object-safe resolution core.
///
/// Implemented by [`Container`](crate::Container). Most callers use the
/// generic helpers of [`Resolver`], which is implemented for every core.
pub trait ResolverCore: Send + Sync {
    /// Resolves `token`, failing with [`DiError::UnregisteredToken`] when it is
    /// bound nowhere in the scope chain.
    fn resolve_token(&self, token: Token) -> BoxFuture<'_, DiResult<Resolved>>;

    /// Resolves `token`, yielding `None` when it is bound nowhere.
    fn try_resolve_token(&self, token: Token) -> BoxFuture<'_, DiResult<Option<Resolved>>>;
}

/// Typed resolution helpers built on [`ResolverCore`].
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, Resolver, ValueProvider};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let container = Container::new();
/// container
///     .register("greeter", ValueProvider::new(Arc::new(English) as Arc<dyn Greeter>))
///     .await?;
///
/// let greeter = container.get_trait::<dyn Greeter>("greeter").await?;
/// assert_eq!(greeter.greet(), "hello");
/// assert!(container.get_optional::<u8>("missing").await?.is_none());
/// # Ok(())
/// # }
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a single value of type `T`.
    fn get<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> BoxFuture<'_, DiResult<Arc<T>>> {
        let token = token.into();
        let pending = self.resolve_token(token.clone());
        async move { pending.await?.downcast::<T>(&token) }.boxed()
    }

    /// Resolves the value bound under [`Token::of::<T>()`](Token::of).
    fn get_type<T: Send + Sync + 'static>(&self) -> BoxFuture<'_, DiResult<Arc<T>>> {
        self.get::<T>(Token::of::<T>())
    }

    /// Resolves a single value, or `None` when the token is bound nowhere.
    fn get_optional<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> BoxFuture<'_, DiResult<Option<Arc<T>>>> {
        let token = token.into();
        let pending = self.try_resolve_token(token.clone());
        async move {
            match pending.await? {
                Some(resolved) => resolved.downcast::<T>(&token).map(Some),
                None => Ok(None),
            }
        }
        .boxed()
    }

    /// Resolves every value of a multi-bound or fanned-out token, flattened.
    fn get_all<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> BoxFuture<'_, DiResult<Vec<Arc<T>>>> {
        let token = token.into();
        let pending = self.resolve_token(token.clone());
        async move { pending.await?.downcast_all::<T>(&token) }.boxed()
    }

    /// Resolves a trait object registered as `Arc<dyn Trait>`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> BoxFuture<'_, DiResult<Arc<T>>> {
        let token = token.into();
        let pending = self.resolve_token(token.clone());
        async move {
            pending
                .await?
                .downcast::<Arc<T>>(&token)
                .map(|boxed| (*boxed).clone())
                .map_err(|_| {
                    DiError::type_mismatch(token.id(), format!("value is not an Arc<{}>", type_name::<T>()))
                })
        }
        .boxed()
    }

    /// Resolves every trait object registered as `Arc<dyn Trait>` under `token`.
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> BoxFuture<'_, DiResult<Vec<Arc<T>>>> {
        let token = token.into();
        let pending = self.resolve_token(token.clone());
        async move {
            pending
                .await?
                .downcast_all::<Arc<T>>(&token)
                .map(|all| all.into_iter().map(|boxed| (*boxed).clone()).collect())
        }
        .boxed()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
