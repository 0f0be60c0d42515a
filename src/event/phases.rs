//! Standard application phases.

use crate::container::Container;
use crate::error::DiResult;

use super::EventPhase;

/// The nine phases of an application's life.
///
/// [`AppPhases::startup`] bootstraps the container and runs the init and
/// start triplets; [`AppPhases::shutdown`] runs the shutdown triplet and
/// destroys the container.
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use ferrous_ioc::{AppPhases, Container, PhaseHandler, ValueProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let phases = AppPhases::new();
/// let started = Arc::new(AtomicUsize::new(0));
/// let seen = started.clone();
/// phases.start.handle(
///     "server",
///     PhaseHandler::from_static("listen", move |_| {
///         let seen = seen.clone();
///         async move {
///             seen.fetch_add(1, Ordering::SeqCst);
///             Ok(())
///         }
///     }),
/// );
///
/// let container = Container::new();
/// container.register("server", ValueProvider::new(())).await?;
/// phases.startup(&container).await?;
/// assert_eq!(started.load(Ordering::SeqCst), 1);
///
/// phases.shutdown(&container).await?;
/// assert!(container.tokens().is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AppPhases {
    pub before_init: EventPhase,
    pub init: EventPhase,
    pub after_init: EventPhase,
    pub before_start: EventPhase,
    pub start: EventPhase,
    pub after_start: EventPhase,
    pub before_shutdown: EventPhase,
    pub shutdown: EventPhase,
    pub after_shutdown: EventPhase,
}

impl AppPhases {
    pub fn new() -> Self {
        Self {
            before_init: EventPhase::new("app:before:init"),
            init: EventPhase::new("app:init"),
            after_init: EventPhase::new("app:after:init"),
            before_start: EventPhase::new("app:before:start"),
            start: EventPhase::new("app:start"),
            after_start: EventPhase::new("app:after:start"),
            before_shutdown: EventPhase::new("app:before:shutdown"),
            shutdown: EventPhase::new("app:shutdown"),
            after_shutdown: EventPhase::new("app:after:shutdown"),
        }
    }

    /// All phases in execution order.
    pub fn all(&self) -> [&EventPhase; 9] {
        [
            &self.before_init,
            &self.init,
            &self.after_init,
            &self.before_start,
            &self.start,
            &self.after_start,
            &self.before_shutdown,
            &self.shutdown,
            &self.after_shutdown,
        ]
    }

    pub async fn startup(&self, container: &Container) -> DiResult<()> {
        container.bootstrap().await?;
        for phase in [&self.before_init, &self.init, &self.after_init] {
            phase.invoke(container).await?;
        }
        for phase in [&self.before_start, &self.start, &self.after_start] {
            phase.invoke(container).await?;
        }
        tracing::debug!(container = container.id(), "application started");
        Ok(())
    }

    pub async fn shutdown(&self, container: &Container) -> DiResult<()> {
        for phase in [&self.before_shutdown, &self.shutdown, &self.after_shutdown] {
            phase.invoke(container).await?;
        }
        container.destroy_all().await?;
        tracing::debug!(container = container.id(), "application shut down");
        Ok(())
    }
}

impl Default for AppPhases {
    fn default() -> Self {
        Self::new()
    }
}
