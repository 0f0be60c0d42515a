use ferrous_ioc::{Container, DiError, FactoryProvider, Pointer, Provider, Resolver, ValueProvider};
use std::sync::Arc;

mod common;

#[tokio::test]
async fn test_child_shadows_parent() {
    common::init_tracing();
    let root = Container::new();
    root.register("mode", ValueProvider::new("root")).await.unwrap();

    let child = root.create_scope();
    child.register("mode", ValueProvider::new("child")).await.unwrap();

    assert_eq!(*child.get::<&str>("mode").await.unwrap(), "child");
    assert_eq!(*root.get::<&str>("mode").await.unwrap(), "root");
}

#[tokio::test]
async fn test_child_falls_back_to_parent() {
    common::init_tracing();
    let root = Container::new();
    root.register("shared", ValueProvider::new(7u32)).await.unwrap();

    let grandchild = root.create_scope().create_scope();
    assert_eq!(*grandchild.get::<u32>("shared").await.unwrap(), 7);
    assert!(grandchild.is_registered("shared"));
    assert!(grandchild.pointer("shared").is_none());
}

#[tokio::test]
async fn test_siblings_are_isolated() {
    common::init_tracing();
    let root = Container::new();
    let left = root.create_scope();
    let right = root.create_scope();

    left.register("only-left", ValueProvider::new(1u8)).await.unwrap();

    assert!(left.is_registered("only-left"));
    assert!(!right.is_registered("only-left"));
    assert!(!root.is_registered("only-left"));

    let error = right.resolve("only-left").await.unwrap_err();
    assert!(error.is_unregistered());
}

#[tokio::test]
async fn test_scope_tree_links() {
    common::init_tracing();
    let root = Container::new();
    let child = root.create_scope();

    assert!(root.is_root());
    assert!(!child.is_root());
    assert!(child.parent().unwrap().ptr_eq(&root));
    assert_eq!(root.children().len(), 1);
    assert!(root.children()[0].ptr_eq(&child));
    assert_ne!(root.id(), child.id());
}

#[tokio::test]
async fn test_unregistered_token_fails() {
    common::init_tracing();
    let container = Container::new();
    let error = container.resolve("missing").await.unwrap_err();
    assert!(matches!(error, DiError::UnregisteredToken(ref token) if token == "missing"));

    assert!(container.try_resolve("missing").await.unwrap().is_none());
    assert!(container.get_optional::<u8>("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resolve_or_fallback_values() {
    common::init_tracing();
    let container = Container::new();

    let single = container
        .resolve_or("missing", [Arc::new(3u8) as ferrous_ioc::AnyArc])
        .await
        .unwrap();
    assert_eq!(*single.downcast::<u8>(&"missing".into()).unwrap(), 3);

    let many = container
        .resolve_or(
            "missing",
            [Arc::new(1u8) as ferrous_ioc::AnyArc, Arc::new(2u8) as ferrous_ioc::AnyArc],
        )
        .await
        .unwrap();
    assert!(many.is_many());
    assert_eq!(many.len(), 2);

    // An empty fallback behaves like a plain resolve
    let error = container.resolve_or("missing", []).await.unwrap_err();
    assert!(error.is_unregistered());

    // Bound tokens ignore the fallback
    container.register("bound", ValueProvider::new(9u8)).await.unwrap();
    let bound = container
        .resolve_or("bound", [Arc::new(0u8) as ferrous_ioc::AnyArc])
        .await
        .unwrap();
    assert_eq!(*bound.downcast::<u8>(&"bound".into()).unwrap(), 9);
}

#[tokio::test]
async fn test_use_provider_lookups() {
    common::init_tracing();
    let root = Container::new();
    root.register("number", ValueProvider::new(1u8)).await.unwrap();
    root.map("alias", "number").unwrap();

    let child = root.create_scope();
    let provider = child.use_provider("alias").unwrap();
    assert_eq!(provider.kind(), "value");

    assert!(child.try_use("missing").unwrap().is_none());
    assert!(child.use_provider("missing").unwrap_err().is_unregistered());

    let fallback = Arc::new(FactoryProvider::from_fn(|_| Ok(0u8)));
    let chosen = child.use_or("missing", fallback).unwrap();
    assert_eq!(chosen.kind(), "factory");
}

#[tokio::test]
async fn test_use_with_several_fallbacks() {
    common::init_tracing();
    let root = Container::new();
    root.register("number", ValueProvider::new(1u8)).await.unwrap();
    let child = root.create_scope();

    let fallbacks = || -> Vec<Arc<dyn Provider>> {
        vec![
            Arc::new(FactoryProvider::from_fn(|_| Ok(0u8))) as Arc<dyn Provider>,
            Arc::new(ValueProvider::new(2u8)) as Arc<dyn Provider>,
        ]
    };

    let bound = child.use_or_many("number", fallbacks()).unwrap();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].kind(), "value");

    let chosen = child.use_or_many("missing", fallbacks()).unwrap();
    let kinds: Vec<&str> = chosen.iter().map(|provider| provider.kind()).collect();
    assert_eq!(kinds, ["factory", "value"]);

    let error = child.use_or_many("missing", Vec::new()).unwrap_err();
    assert!(error.is_unregistered());
}

#[tokio::test]
async fn test_duplicate_binding_keeps_first() {
    common::init_tracing();
    let container = Container::new();
    container.register("token", ValueProvider::new(1u8)).await.unwrap();

    let error = container
        .register("token", ValueProvider::new(2u8))
        .await
        .unwrap_err();
    assert!(matches!(error, DiError::DuplicateBinding(_)));
    assert_eq!(*container.get::<u8>("token").await.unwrap(), 1);
    assert!(matches!(container.pointer("token"), Some(Pointer::SingleProvider(_))));

    let error = container.map("token", "elsewhere").unwrap_err();
    assert!(matches!(error, DiError::DuplicateBinding(_)));
}

#[tokio::test]
async fn test_concurrent_resolution_across_scopes() {
    common::init_tracing();
    let root = Container::new();
    root.register("value", ValueProvider::new(42u64)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let scope = root.create_scope();
        handles.push(tokio::spawn(async move {
            let value = scope.get::<u64>("value").await.unwrap();
            *value
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 42);
    }
    assert_eq!(root.children().len(), 8);
}
