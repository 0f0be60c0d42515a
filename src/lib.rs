//! # ferrous-ioc
//!
//! Hierarchical, asynchronous inversion-of-control container.
//!
//! ## Features
//!
//! - **Token bindings**: values are bound to string [`Token`]s, directly or
//!   through aliases, singly or as multi-bindings
//! - **Provider lifecycle**: every binding goes through
//!   `register → resolve ⇄ dispose → destroy`, with value, factory and class
//!   providers built in
//! - **Scopes**: child containers inherit their parent's bindings for lookup
//!   and may shadow them
//! - **Cycle detection**: dependency and alias cycles are rejected at
//!   registration time with the full path
//! - **Observers**: every lifecycle step emits a typed event; listeners may
//!   veto the operation by returning an error
//! - **Ordered phases**: application phases run handlers in dependency waves
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_ioc::{ClassProvider, Container, FactoryProvider, Resolver, Token, ValueProvider};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_ioc::DiResult<()> {
//! let container = Container::new();
//!
//! container.register("database.url", ValueProvider::new(String::from("postgres://localhost"))).await?;
//! container
//!     .register_provider(FactoryProvider::new(|container| async move {
//!         let url = container.get::<String>("database.url").await?;
//!         Ok(Database { url: url.to_string() })
//!     })
//!     .once()
//!     .depends_on(["database.url"]))
//!     .await?;
//! container
//!     .register_provider(
//!         ClassProvider::new(|args| Ok(UserService { db: args.get::<Database>(0)? }))
//!             .parameter(Token::of::<Database>()),
//!     )
//!     .await?;
//!
//! let users = container.get_type::<UserService>().await?;
//! assert_eq!(users.db.url, "postgres://localhost");
//! # Ok(())
//! # }
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use ferrous_ioc::{Container, Resolver, ValueProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_ioc::DiResult<()> {
//! let root = Container::new();
//! root.register("region", ValueProvider::new("eu")).await?;
//!
//! let request = root.create_scope();
//! assert_eq!(*request.get::<&str>("region").await?, "eu");
//!
//! request.register("region", ValueProvider::new("us")).await?;
//! assert_eq!(*request.get::<&str>("region").await?, "us");
//! assert_eq!(*root.get::<&str>("region").await?, "eu");
//! # Ok(())
//! # }
//! ```
//!
//! ## Fan-out
//!
//! ```rust
//! use ferrous_ioc::{Container, Resolver, ValueProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_ioc::DiResult<()> {
//! let container = Container::new();
//! container.register("x", ValueProvider::new(1u32)).await?;
//! container.register("y", ValueProvider::new(2u32)).await?;
//! container.map_many("numbers", ["x", "y"])?;
//!
//! let numbers: Vec<u32> = container
//!     .get_all::<u32>("numbers")
//!     .await?
//!     .into_iter()
//!     .map(|n| *n)
//!     .collect();
//! assert_eq!(numbers, [1, 2]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod registry;
pub mod resolved;
pub mod token;
pub mod traits;
pub mod waves;

mod internal;

pub use config::{Config, ConfigSource, ConfigValue, EnvironmentConfigSource, Mode};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use container::{Container, Pointer};
pub use error::{DiError, DiResult};
pub use event::{AppPhases, EventPhase, PhaseHandler};
pub use lifetime::{ClassScope, FactoryScope};
pub use observer::{
    BootstrapEvent, ContainerEvent, DestroyEvent, DestroyedEvent, DisposeEvent, DisposedEvent, Emitter,
    EventKind, LifecycleEvent, Observer, RegisterEvent, RegisteredEvent, ResolveEvent, ResolvedEvent,
    Subscription,
};
pub use provider::{
    hook, ClassContext, ClassProvider, ConstructorArgs, FactoryContext, FactoryProvider, Hook, Provider,
    ProviderContext, ProviderState, ValueContext, ValueProvider,
};
pub use registry::TokenRegistry;
pub use resolved::{AnyArc, Resolved};
pub use token::Token;
pub use traits::{AsyncDispose, Resolver, ResolverCore};
pub use waves::{plan_waves, run_waves, WaveEntry};
