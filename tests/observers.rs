use ferrous_ioc::{
    Container, DiError, EventKind, FactoryProvider, Observer, RegisterEvent, RegisteredEvent, ResolveEvent,
    ResolvedEvent, Resolver, ValueProvider,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;

#[tokio::test]
async fn test_observer_sees_lifecycle_in_order() {
    common::init_tracing();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let push = |entry: &'static str| {
        let log = log.clone();
        move || log.lock().push(entry)
    };

    let (register, registered, resolve, resolved) = (push("register"), push("registered"), push("resolve"), push("resolved"));
    let (dispose, disposed, destroy, destroyed) = (push("dispose"), push("disposed"), push("destroy"), push("destroyed"));

    let container = Container::new();
    let _subscription = container.observe(
        "service",
        Observer::new()
            .on_register(move |_| {
                register();
                async { Ok(()) }
            })
            .on_registered(move |_| {
                registered();
                async { Ok(()) }
            })
            .on_resolve(move |_| {
                resolve();
                async { Ok(()) }
            })
            .on_resolved(move |_| {
                resolved();
                async { Ok(()) }
            })
            .on_dispose(move |_| {
                dispose();
                async { Ok(()) }
            })
            .on_disposed(move |_| {
                disposed();
                async { Ok(()) }
            })
            .on_destroy(move |_| {
                destroy();
                async { Ok(()) }
            })
            .on_destroyed(move |_| {
                destroyed();
                async { Ok(()) }
            }),
    );

    container.register("service", ValueProvider::new(1u8)).await.unwrap();
    container.resolve("service").await.unwrap();
    container.dispose("service").await.unwrap();
    container.destroy("service").await.unwrap();

    assert_eq!(
        *log.lock(),
        ["register", "registered", "resolve", "resolved", "dispose", "disposed", "destroy", "destroyed"]
    );
}

#[tokio::test]
async fn test_register_fires_on_failure_and_registered_only_on_success() {
    common::init_tracing();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let (register_log, registered_log) = (log.clone(), log.clone());

    let container = Container::new();
    container.events().on(move |_: RegisterEvent| {
        register_log.lock().push("register");
        async { Ok(()) }
    });
    container.events().on(move |_: RegisteredEvent| {
        registered_log.lock().push("registered");
        async { Ok(()) }
    });

    container
        .register("service", FactoryProvider::from_fn(|_| Ok("service")).depends_on(["helper"]))
        .await
        .unwrap();

    let duplicate = container.register("service", ValueProvider::new("other")).await.unwrap_err();
    assert!(matches!(duplicate, DiError::DuplicateBinding(_)));

    let cycle = container
        .register("helper", FactoryProvider::from_fn(|_| Ok("helper")).depends_on(["service"]))
        .await
        .unwrap_err();
    assert!(matches!(cycle, DiError::CircularDependency(_)));

    assert_eq!(*log.lock(), ["register", "registered", "register", "register"]);
    assert_eq!(*container.get::<&str>("service").await.unwrap(), "service");
    assert!(!container.is_registered("helper"));
}

#[tokio::test]
async fn test_observer_filters_by_token() {
    common::init_tracing();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = seen.clone();

    let container = Container::new();
    container.observe(
        "watched",
        Observer::new().on_resolved(move |event| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event.token.id().to_string());
                Ok(())
            }
        }),
    );

    container.register("watched", ValueProvider::new(1u8)).await.unwrap();
    container.register("other", ValueProvider::new(2u8)).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let container = container.clone();
            tokio::spawn(async move {
                let token = if index % 2 == 0 { "watched" } else { "other" };
                container.resolve(token).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|token| token == "watched"));
}

#[tokio::test]
async fn test_observer_can_veto_registration() {
    common::init_tracing();
    let container = Container::new();
    container.observe(
        "secret",
        Observer::new().on_register(|_| async { Err(DiError::rejected("secrets are read-only")) }),
    );

    let error = container
        .register("secret", ValueProvider::new("hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(error, DiError::Rejected(_)));
    assert!(!container.is_registered("secret"));

    // Other tokens are unaffected
    container.register("public", ValueProvider::new("ok")).await.unwrap();
}

#[tokio::test]
async fn test_observer_can_veto_resolution() {
    common::init_tracing();
    let container = Container::new();
    container.register("guarded", ValueProvider::new(1u8)).await.unwrap();
    container.observe(
        "guarded",
        Observer::new().on_resolve(|_| async { Err(DiError::rejected("denied")) }),
    );

    assert!(matches!(
        container.resolve("guarded").await.unwrap_err(),
        DiError::Rejected(_)
    ));
}

#[tokio::test]
async fn test_unsubscribe_removes_every_callback() {
    common::init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let (on_resolve, on_resolved) = (calls.clone(), calls.clone());

    let container = Container::new();
    container.register("token", ValueProvider::new(1u8)).await.unwrap();
    let subscription = container.observe(
        "token",
        Observer::new()
            .on_resolve(move |_| {
                on_resolve.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .on_resolved(move |_| {
                on_resolved.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            }),
    );
    assert_eq!(container.events().listener_count(), 2);

    container.resolve("token").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let copy = subscription.clone();
    subscription.unsubscribe();
    copy.unsubscribe();
    assert!(!copy.is_active());
    assert_eq!(container.events().listener_count(), 0);

    container.resolve("token").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_callback_can_unsubscribe_itself() {
    common::init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let container = Container::new();
    container.register("token", ValueProvider::new(1u8)).await.unwrap();
    let subscription = container.observe(
        "token",
        Observer::new().on_resolved(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = &event.subscription {
                subscription.unsubscribe();
            }
            async { Ok(()) }
        }),
    );

    container.resolve("token").await.unwrap();
    container.resolve("token").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!subscription.is_active());
    assert_eq!(container.events().listener_count(), 0);

    // Raw listeners get their own handle too
    let raw = container.events().on(|event: ResolveEvent| async move {
        assert!(event.subscription.is_some_and(|subscription| subscription.is_active()));
        Ok(())
    });
    container.resolve("token").await.unwrap();
    raw.unsubscribe();
}

#[tokio::test]
async fn test_raw_listeners_receive_payloads() {
    common::init_tracing();
    let resolved_values = Arc::new(Mutex::new(Vec::<u8>::new()));
    let sink = resolved_values.clone();
    let resolves = Arc::new(AtomicUsize::new(0));
    let resolve_counter = resolves.clone();

    let container = Container::new();
    container.events().on(move |event: ResolvedEvent| {
        let sink = sink.clone();
        async move {
            if let Some(value) = event.value_as::<u8>() {
                sink.lock().push(*value);
            }
            Ok(())
        }
    });
    container.events().on(move |_: ResolveEvent| {
        resolve_counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    });
    container.events().on(|event: RegisteredEvent| async move {
        assert_eq!(event.provider.kind(), "value");
        Ok(())
    });

    container.register("a", ValueProvider::new(10u8)).await.unwrap();
    container.register("b", ValueProvider::new(20u8)).await.unwrap();
    container.map_many("both", ["a", "b"]).unwrap();
    container.get_all::<u8>("both").await.unwrap();

    // One resolve event for the alias and one per target
    assert_eq!(resolves.load(Ordering::SeqCst), 3);
    let mut values = resolved_values.lock().clone();
    values.sort();
    assert_eq!(values, [10, 20]);
}

#[tokio::test]
async fn test_bootstrap_event() {
    common::init_tracing();
    let booted = Arc::new(AtomicUsize::new(0));
    let counter = booted.clone();

    let container = Container::new();
    container.events().on(move |event: ferrous_ioc::BootstrapEvent| {
        let counter = counter.clone();
        async move {
            assert!(event.container.is_root());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    container.bootstrap().await.unwrap();
    assert_eq!(booted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_event_kinds_are_distinct() {
    let kinds = [
        EventKind::Bootstrap,
        EventKind::Register,
        EventKind::Registered,
        EventKind::Resolve,
        EventKind::Resolved,
        EventKind::Dispose,
        EventKind::Disposed,
        EventKind::Destroy,
        EventKind::Destroyed,
    ];
    let unique: std::collections::HashSet<_> = kinds.iter().collect();
    assert_eq!(unique.len(), kinds.len());
}
