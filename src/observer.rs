//! Lifecycle events, the per-container emitter and token-filtered observers.
//!
//! Every container owns an [`Emitter`]. The container awaits each emission
//! before it continues, and listeners run one after another in subscription
//! order, so a listener returning an error aborts the operation it observes.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{ready, BoxFuture};
use futures::FutureExt;
use parking_lot::RwLock;

use crate::container::Container;
use crate::error::DiResult;
use crate::provider::Provider;
use crate::resolved::AnyArc;
use crate::token::Token;

/// Discriminant of a [`ContainerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Bootstrap,
    Register,
    Registered,
    Resolve,
    Resolved,
    Dispose,
    Disposed,
    Destroy,
    Destroyed,
}

/// Emitted once by [`Container::bootstrap`].
#[derive(Clone, Debug)]
pub struct BootstrapEvent {
    pub container: Container,
    /// Subscription delivering this event; lets a callback unsubscribe itself.
    pub subscription: Option<Subscription>,
}

/// Emitted before a registration is checked and installed.
#[derive(Clone, Debug)]
pub struct RegisterEvent {
    pub container: Container,
    pub token: Token,
    pub subscription: Option<Subscription>,
}

/// Emitted after a provider was installed and registered.
#[derive(Clone, Debug)]
pub struct RegisteredEvent {
    pub container: Container,
    pub token: Token,
    pub provider: Arc<dyn Provider>,
    pub subscription: Option<Subscription>,
}

/// Emitted before a token is looked up for resolution.
#[derive(Clone, Debug)]
pub struct ResolveEvent {
    pub container: Container,
    pub token: Token,
    pub subscription: Option<Subscription>,
}

/// Emitted after each leaf provider produced its value.
#[derive(Clone, Debug)]
pub struct ResolvedEvent {
    pub container: Container,
    pub token: Token,
    pub provider: Arc<dyn Provider>,
    pub value: AnyArc,
    pub subscription: Option<Subscription>,
}

impl ResolvedEvent {
    /// The resolved value, if it is a `T`.
    pub fn value_as<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }
}

/// Emitted before a token's providers are disposed.
#[derive(Clone, Debug)]
pub struct DisposeEvent {
    pub container: Container,
    pub token: Token,
    pub subscription: Option<Subscription>,
}

/// Emitted after each leaf provider was disposed.
#[derive(Clone, Debug)]
pub struct DisposedEvent {
    pub container: Container,
    pub token: Token,
    pub provider: Arc<dyn Provider>,
    pub subscription: Option<Subscription>,
}

/// Emitted before a token's providers are destroyed.
#[derive(Clone, Debug)]
pub struct DestroyEvent {
    pub container: Container,
    pub token: Token,
    pub subscription: Option<Subscription>,
}

/// Emitted after each leaf provider was destroyed.
#[derive(Clone, Debug)]
pub struct DestroyedEvent {
    pub container: Container,
    pub token: Token,
    pub provider: Arc<dyn Provider>,
    pub subscription: Option<Subscription>,
}

/// Closed set of container lifecycle events.
#[derive(Clone, Debug)]
pub enum ContainerEvent {
    Bootstrap(BootstrapEvent),
    Register(RegisterEvent),
    Registered(RegisteredEvent),
    Resolve(ResolveEvent),
    Resolved(ResolvedEvent),
    Dispose(DisposeEvent),
    Disposed(DisposedEvent),
    Destroy(DestroyEvent),
    Destroyed(DestroyedEvent),
}

impl ContainerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ContainerEvent::Bootstrap(_) => EventKind::Bootstrap,
            ContainerEvent::Register(_) => EventKind::Register,
            ContainerEvent::Registered(_) => EventKind::Registered,
            ContainerEvent::Resolve(_) => EventKind::Resolve,
            ContainerEvent::Resolved(_) => EventKind::Resolved,
            ContainerEvent::Dispose(_) => EventKind::Dispose,
            ContainerEvent::Disposed(_) => EventKind::Disposed,
            ContainerEvent::Destroy(_) => EventKind::Destroy,
            ContainerEvent::Destroyed(_) => EventKind::Destroyed,
        }
    }

    /// The token the event concerns; `None` for bootstrap.
    pub fn token(&self) -> Option<&Token> {
        match self {
            ContainerEvent::Bootstrap(_) => None,
            ContainerEvent::Register(event) => Some(&event.token),
            ContainerEvent::Registered(event) => Some(&event.token),
            ContainerEvent::Resolve(event) => Some(&event.token),
            ContainerEvent::Resolved(event) => Some(&event.token),
            ContainerEvent::Dispose(event) => Some(&event.token),
            ContainerEvent::Disposed(event) => Some(&event.token),
            ContainerEvent::Destroy(event) => Some(&event.token),
            ContainerEvent::Destroyed(event) => Some(&event.token),
        }
    }

    /// Attaches the handle of the subscription the event is delivered to.
    pub(crate) fn with_subscription(mut self, subscription: Subscription) -> Self {
        let slot = match &mut self {
            ContainerEvent::Bootstrap(event) => &mut event.subscription,
            ContainerEvent::Register(event) => &mut event.subscription,
            ContainerEvent::Registered(event) => &mut event.subscription,
            ContainerEvent::Resolve(event) => &mut event.subscription,
            ContainerEvent::Resolved(event) => &mut event.subscription,
            ContainerEvent::Dispose(event) => &mut event.subscription,
            ContainerEvent::Disposed(event) => &mut event.subscription,
            ContainerEvent::Destroy(event) => &mut event.subscription,
            ContainerEvent::Destroyed(event) => &mut event.subscription,
        };
        *slot = Some(subscription);
        self
    }

    pub fn container(&self) -> &Container {
        match self {
            ContainerEvent::Bootstrap(event) => &event.container,
            ContainerEvent::Register(event) => &event.container,
            ContainerEvent::Registered(event) => &event.container,
            ContainerEvent::Resolve(event) => &event.container,
            ContainerEvent::Resolved(event) => &event.container,
            ContainerEvent::Dispose(event) => &event.container,
            ContainerEvent::Disposed(event) => &event.container,
            ContainerEvent::Destroy(event) => &event.container,
            ContainerEvent::Destroyed(event) => &event.container,
        }
    }
}

/// Typed payload of one [`EventKind`].
pub trait LifecycleEvent: Clone + Send + Sync + 'static {
    const KIND: EventKind;

    /// Extracts the payload if `event` is of this kind.
    fn from_event(event: ContainerEvent) -> Option<Self>;
}

macro_rules! lifecycle_event {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl LifecycleEvent for $payload {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: ContainerEvent) -> Option<Self> {
                    match event {
                        ContainerEvent::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }

            impl From<$payload> for ContainerEvent {
                fn from(payload: $payload) -> Self {
                    ContainerEvent::$variant(payload)
                }
            }
        )*
    };
}

lifecycle_event! {
    BootstrapEvent => Bootstrap,
    RegisterEvent => Register,
    RegisteredEvent => Registered,
    ResolveEvent => Resolve,
    ResolvedEvent => Resolved,
    DisposeEvent => Dispose,
    DisposedEvent => Disposed,
    DestroyEvent => Destroy,
    DestroyedEvent => Destroyed,
}

type Listener = Arc<dyn Fn(ContainerEvent) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;

struct ListenerEntry {
    id: u64,
    kind: EventKind,
    listener: Listener,
}

type ListenerList = RwLock<Vec<ListenerEntry>>;

fn typed_listener<E, F, Fut>(f: F) -> Listener
where
    E: LifecycleEvent,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<()>> + Send + 'static,
{
    Arc::new(move |event: ContainerEvent| match E::from_event(event) {
        Some(payload) => f(payload).boxed(),
        None => ready(Ok(())).boxed(),
    })
}

/// Wraps `listener` so it only sees events about `token` (any token when
/// `None`) and receives `subscription` in the payload.
fn bound(token: Option<Token>, subscription: Subscription, listener: Listener) -> Listener {
    Arc::new(move |event: ContainerEvent| {
        if let Some(token) = &token {
            if event.token() != Some(token) {
                return ready(Ok(())).boxed();
            }
        }
        listener(event.with_subscription(subscription.clone()))
    })
}

/// Per-container event bus.
#[derive(Default)]
pub struct Emitter {
    next_id: AtomicU64,
    listeners: Arc<ListenerList>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an unfiltered listener for the event type `E`.
    ///
    /// The event type is picked from the closure's argument:
    ///
    /// ```rust
    /// use ferrous_ioc::{Container, ResolvedEvent};
    ///
    /// let container = Container::new();
    /// let subscription = container.events().on(|event: ResolvedEvent| async move {
    ///     println!("resolved {}", event.token);
    ///     Ok(())
    /// });
    /// subscription.unsubscribe();
    /// ```
    pub fn on<E, F, Fut>(&self, f: F) -> Subscription
    where
        E: LifecycleEvent,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        self.subscribe(vec![(E::KIND, typed_listener(f))], None)
    }

    /// Subscribes every callback of `observer`, each filtered to events whose
    /// token id equals `token`'s. One [`Subscription`] removes them all.
    pub fn observe(&self, token: impl Into<Token>, observer: Observer) -> Subscription {
        self.subscribe(observer.handlers, Some(token.into()))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Invokes the matching listeners in subscription order, stopping at the
    /// first error.
    pub(crate) async fn emit(&self, event: ContainerEvent) -> DiResult<()> {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.listener.clone())
            .collect();

        for listener in listeners {
            listener(event.clone()).await?;
        }
        Ok(())
    }

    fn subscribe(&self, handlers: Vec<(EventKind, Listener)>, token: Option<Token>) -> Subscription {
        let ids: Vec<u64> = handlers
            .iter()
            .map(|_| self.next_id.fetch_add(1, Ordering::Relaxed))
            .collect();
        let subscription = self.subscription(ids.clone());

        let mut listeners = self.listeners.write();
        for (id, (kind, listener)) in ids.into_iter().zip(handlers) {
            listeners.push(ListenerEntry {
                id,
                kind,
                listener: bound(token.clone(), subscription.clone(), listener),
            });
        }
        subscription
    }

    fn subscription(&self, ids: Vec<u64>) -> Subscription {
        Subscription {
            ids: Arc::new(ids),
            listeners: Arc::downgrade(&self.listeners),
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle removing the listeners it was created for.
///
/// Dropping the handle keeps the listeners subscribed. Clones share state, so
/// unsubscribing through any clone removes the listeners exactly once.
#[derive(Clone)]
pub struct Subscription {
    ids: Arc<Vec<u64>>,
    listeners: Weak<ListenerList>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|entry| !self.ids.contains(&entry.id));
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listeners", &self.ids.len())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Set of callbacks for one observed token.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DiError, Observer, ValueProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_ioc::DiResult<()> {
/// let container = Container::new();
/// let subscription = container.observe(
///     "secret",
///     Observer::new().on_register(|_| async { Err(DiError::rejected("secret is read-only")) }),
/// );
///
/// let result = container.register("secret", ValueProvider::new(42u32)).await;
/// assert!(matches!(result, Err(DiError::Rejected(_))));
///
/// subscription.unsubscribe();
/// container.register("secret", ValueProvider::new(42u32)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default, Clone)]
pub struct Observer {
    handlers: Vec<(EventKind, Listener)>,
}

macro_rules! observer_callbacks {
    ($($(#[$doc:meta])* $method:ident => $payload:ty;)*) => {
        impl Observer {
            $(
                $(#[$doc])*
                pub fn $method<F, Fut>(mut self, f: F) -> Self
                where
                    F: Fn($payload) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = DiResult<()>> + Send + 'static,
                {
                    self.handlers.push((<$payload as LifecycleEvent>::KIND, typed_listener(f)));
                    self
                }
            )*
        }
    };
}

observer_callbacks! {
    /// Before the registration checks run.
    on_register => RegisterEvent;
    /// After the provider registered successfully.
    on_registered => RegisteredEvent;
    /// Before lookup.
    on_resolve => ResolveEvent;
    /// After each leaf provider resolved.
    on_resolved => ResolvedEvent;
    on_dispose => DisposeEvent;
    on_disposed => DisposedEvent;
    on_destroy => DestroyEvent;
    on_destroyed => DestroyedEvent;
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks set.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(kind, _)| kind))
            .finish()
    }
}
