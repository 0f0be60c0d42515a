/// Unit tests for Token construction and comparison
use ferrous_ioc::{DiError, Token};
use std::collections::HashSet;

struct Database;

#[test]
fn test_token_identity_is_its_id() {
    let a = Token::new("service");
    let b = Token::from(String::from("service"));
    assert_eq!(a, b);
    assert!(a.matches("service"));
    assert!(!a.matches("other"));

    let set: HashSet<Token> = [a, b, Token::new("other")].into_iter().collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_token_display_and_debug() {
    let token = Token::new("logger");
    assert_eq!(token.to_string(), "logger");
    assert_eq!(format!("{token:?}"), "Token(\"logger\")");
    assert_eq!(token.as_ref(), "logger");
}

#[test]
fn test_create_joins_with_colon() {
    assert_eq!(Token::create(["app", "db", "pool"]).id(), "app:db:pool");
    assert_eq!(Token::create(["single"]).id(), "single");
}

#[test]
fn test_concat_and_variant() {
    let base = Token::new("cache");
    let redis = base.variant("redis");
    assert_eq!(redis.id(), "cache:redis");

    let nested = Token::concat([&redis, &Token::new("primary")]);
    assert_eq!(nested.id(), "cache:redis:primary");
    assert_ne!(nested, base);
}

#[test]
fn test_type_tokens() {
    let token = Token::of::<Database>();
    assert!(token.id().ends_with("Database"));
    assert_eq!(token, Token::of::<Database>());
    assert_ne!(token, Token::of::<String>());
}

#[test]
fn test_from_any() {
    let token = Token::new("x");
    assert_eq!(Token::from_any(&token).unwrap(), token);
    assert_eq!(Token::from_any(&"x").unwrap(), token);
    assert_eq!(Token::from_any(&String::from("x")).unwrap(), token);

    let error = Token::from_any(&7i64).unwrap_err();
    assert!(matches!(error, DiError::InvalidToken(_)));
    assert!(Token::try_from_any(&vec![1u8]).is_none());
}
