use ferrous_ioc::{
    ClassProvider, ClassScope, Container, DiError, DiResult, FactoryProvider, Provider, ProviderState, Resolver,
    Token, ValueProvider,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;

#[derive(Debug)]
struct Settings {
    url: String,
}

#[derive(Debug)]
struct Repository {
    settings: Arc<Settings>,
}

struct Service {
    repository: Arc<Repository>,
    label: Option<Arc<String>>,
}

#[tokio::test]
async fn test_value_provider_resolves_same_value() {
    common::init_tracing();
    let container = Container::new();
    container
        .register_provider(ValueProvider::new(Settings { url: "postgres://db".into() }))
        .await
        .unwrap();

    let first = container.get_type::<Settings>().await.unwrap();
    let second = container.get_type::<Settings>().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.url, "postgres://db");
}

#[tokio::test]
async fn test_factory_repeated_runs_every_time() {
    common::init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let container = Container::new();
    container
        .register(
            "counter",
            FactoryProvider::new(move |_| {
                let counter = counter.clone();
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
            }),
        )
        .await
        .unwrap();

    assert_eq!(*container.get::<usize>("counter").await.unwrap(), 0);
    assert_eq!(*container.get::<usize>("counter").await.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_factory_once_caches_until_disposed() {
    common::init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let released = Arc::new(AtomicUsize::new(0));
    let released_hook = released.clone();

    let container = Container::new();
    container
        .register(
            "once",
            FactoryProvider::from_fn(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst)))
                .once()
                .when_disposed(move |context| {
                    let released = released_hook.clone();
                    async move {
                        assert!(context.value.is_some());
                        released.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
        )
        .await
        .unwrap();

    let first = container.get::<usize>("once").await.unwrap();
    let second = container.get::<usize>("once").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    container.dispose("once").await.unwrap();
    assert_eq!(released.load(Ordering::SeqCst), 1);

    // A second dispose has nothing cached to release
    container.dispose("once").await.unwrap();
    assert_eq!(released.load(Ordering::SeqCst), 1);

    assert_eq!(*container.get::<usize>("once").await.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_class_singleton_and_transient() {
    common::init_tracing();
    let container = Container::new();
    container
        .register("singleton", ClassProvider::new(|_| Ok(Settings { url: "a".into() })))
        .await
        .unwrap();
    container
        .register(
            "transient",
            ClassProvider::new(|_| Ok(Settings { url: "b".into() })).scope(ClassScope::Transient),
        )
        .await
        .unwrap();

    let a1 = container.get::<Settings>("singleton").await.unwrap();
    let a2 = container.get::<Settings>("singleton").await.unwrap();
    assert!(Arc::ptr_eq(&a1, &a2));

    let b1 = container.get::<Settings>("transient").await.unwrap();
    let b2 = container.get::<Settings>("transient").await.unwrap();
    assert!(!Arc::ptr_eq(&b1, &b2));
}

#[tokio::test]
async fn test_class_transients_disposed_together() {
    common::init_tracing();
    let disposed = Arc::new(AtomicUsize::new(0));
    let seen = disposed.clone();

    let provider = Arc::new(
        ClassProvider::new(|_| Ok(Settings { url: "t".into() }))
            .transient()
            .when_disposed(move |_| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
    );

    let container = Container::new();
    container.register_shared("transient", provider.clone()).await.unwrap();
    container.resolve("transient").await.unwrap();
    container.resolve("transient").await.unwrap();
    container.resolve("transient").await.unwrap();
    assert_eq!(provider.instance_count(), 3);

    container.dispose("transient").await.unwrap();
    assert_eq!(disposed.load(Ordering::SeqCst), 3);
    assert_eq!(provider.instance_count(), 0);
    assert_eq!(provider.state(), ProviderState::Disposed);
}

#[tokio::test]
async fn test_class_builds_arguments_from_parameters() {
    common::init_tracing();
    let container = Container::new();
    container
        .register_provider(ValueProvider::new(Settings { url: "postgres://db".into() }))
        .await
        .unwrap();
    container
        .register_provider(
            ClassProvider::new(|args| {
                Ok(Repository {
                    settings: args.get(0)?,
                })
            })
            .parameter(Token::of::<Settings>()),
        )
        .await
        .unwrap();
    container
        .register_provider(
            ClassProvider::new(|args| {
                Ok(Service {
                    repository: args.get(0)?,
                    label: args.optional(1)?,
                })
            })
            .parameter(Token::of::<Repository>())
            .optional_parameter("label"),
        )
        .await
        .unwrap();

    let service = container.get_type::<Service>().await.unwrap();
    assert_eq!(service.repository.settings.url, "postgres://db");
    assert!(service.label.is_none());
}

#[tokio::test]
async fn test_class_missing_required_parameter() {
    common::init_tracing();
    let container = Container::new();
    container
        .register_provider(
            ClassProvider::new(|args| Ok(Repository { settings: args.get(0)? })).parameter("settings"),
        )
        .await
        .unwrap();

    let error = container.get_type::<Repository>().await.unwrap_err();
    assert!(matches!(error, DiError::UnregisteredToken(ref token) if token == "settings"));
}

#[tokio::test]
async fn test_class_argument_override_wins() {
    common::init_tracing();
    let container = Container::new();
    container
        .register("settings", ValueProvider::new(Settings { url: "declared".into() }))
        .await
        .unwrap();
    container
        .register_provider(
            ClassProvider::new(|args| Ok(Repository { settings: args.get(0)? }))
                .parameter("settings")
                .with_argument(0, |_| async { Ok(Settings { url: "override".into() }) }),
        )
        .await
        .unwrap();

    let repository = container.get_type::<Repository>().await.unwrap();
    assert_eq!(repository.settings.url, "override");
}

#[tokio::test]
async fn test_class_property_injection_and_statics() {
    common::init_tracing();
    #[derive(Default)]
    struct Handler {
        settings: Option<Arc<Settings>>,
    }

    let provider = Arc::new(
        ClassProvider::<Handler>::from_default()
            .inject("settings", "settings", |handler: &mut Handler, value: Arc<Settings>| {
                handler.settings = Some(value);
            })
            .static_property("version", |_| async { Ok(3u32) }),
    );

    let container = Container::new();
    container
        .register("settings", ValueProvider::new(Settings { url: "injected".into() }))
        .await
        .unwrap();
    container.register_shared(Token::of::<Handler>(), provider.clone()).await.unwrap();

    let handler = container.get_type::<Handler>().await.unwrap();
    assert_eq!(handler.settings.as_ref().map(|s| s.url.as_str()), Some("injected"));
    assert_eq!(provider.statics().get::<u32>("version").as_deref(), Some(&3));
    assert!(provider.dependencies().contains(&Token::new("settings")));
}

type Log = Arc<parking_lot::Mutex<Vec<String>>>;

fn record<C: 'static>(log: &Log, entry: &'static str) -> impl Fn(C) -> BoxFuture<'static, DiResult<()>> + Send + Sync {
    let log = log.clone();
    move |_| {
        let log = log.clone();
        async move {
            log.lock().push(entry.to_string());
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_class_hooks_run_in_order() {
    common::init_tracing();
    let log: Log = Arc::default();

    let container = Container::new();
    container
        .register(
            "hooked",
            ClassProvider::new(|_| Ok(Settings { url: "h".into() }))
                .register_hook("register", record(&log, "register"))
                .static_resolve_hook("static_resolve", record(&log, "static_resolve"))
                .resolve_hook("resolve", record(&log, "resolve"))
                .static_dispose_hook("static_dispose", record(&log, "static_dispose"))
                .dispose_hook("dispose", record(&log, "dispose"))
                .destroy_hook("destroy", record(&log, "destroy")),
        )
        .await
        .unwrap();

    container.resolve("hooked").await.unwrap();
    container.resolve("hooked").await.unwrap();
    container.dispose("hooked").await.unwrap();
    container.destroy("hooked").await.unwrap();
    assert!(!container.is_registered("hooked"));

    assert_eq!(
        *log.lock(),
        ["register", "static_resolve", "resolve", "static_dispose", "dispose", "destroy"]
    );
}

#[tokio::test]
async fn test_destroyed_provider_rejects_use() {
    common::init_tracing();
    let provider = Arc::new(ValueProvider::new(5u8));
    let container = Container::new();
    container.register_shared("five", provider.clone()).await.unwrap();
    container.destroy("five").await.unwrap();
    assert_eq!(provider.state(), ProviderState::Destroyed);

    let other = Container::new();
    let error = other.register_shared("five", provider).await.unwrap_err();
    assert!(matches!(error, DiError::ProviderDestroyed(_)));
    assert!(!other.is_registered("five"));
}

#[tokio::test]
async fn test_register_hook_can_veto() {
    common::init_tracing();
    let container = Container::new();
    let error = container
        .register(
            "vetoed",
            ValueProvider::new(1u8).on_register(|_| async { Err(DiError::rejected("not allowed")) }),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, DiError::Rejected(_)));
    assert!(container.pointer("vetoed").is_none());
}

#[tokio::test]
async fn test_factory_receives_resolving_container() {
    common::init_tracing();
    let root = Container::new();
    root.register(
        "greeting",
        FactoryProvider::new(|container: Container| async move {
            let name = container.get::<&str>("name").await?;
            Ok(format!("hello {name}"))
        }),
    )
    .await
    .unwrap();
    root.register("name", ValueProvider::new("root")).await.unwrap();

    let scope = root.create_scope();
    scope.register("name", ValueProvider::new("scope")).await.unwrap();

    // The factory is bound in the root, so it resolves from the root
    assert_eq!(*scope.get::<String>("greeting").await.unwrap(), "hello root");
}
