/// Unit tests for DiError and DiResult
use ferrous_ioc::{DiError, DiResult};
use std::error::Error;
use std::fmt;

#[test]
fn test_error_display_unregistered() {
    let error = DiError::UnregisteredToken("database".into());
    assert_eq!(error.to_string(), "Token is not registered: database");
    assert!(error.is_unregistered());
    assert!(error.cycle().is_none());
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::type_mismatch("port", "expected u16");
    assert_eq!(error.to_string(), "Type mismatch for port: expected u16");
    assert!(!error.is_unregistered());
}

#[test]
fn test_error_display_circular_dependency() {
    let path = vec!["A".to_string(), "B".to_string(), "A".to_string()];
    let error = DiError::CircularDependency(path.clone());
    assert_eq!(error.to_string(), "Circular dependency detected: A -> B -> A");
    assert_eq!(error.cycle().unwrap(), path.as_slice());
}

#[test]
fn test_error_display_circular_mapping() {
    let error = DiError::CircularMapping(vec!["X".into(), "X".into()]);
    assert_eq!(error.to_string(), "Circular mapping detected: X -> X");
    assert_eq!(error.cycle().unwrap().len(), 2);
}

#[test]
fn test_error_display_simple_variants() {
    assert_eq!(DiError::InvalidToken("7".into()).to_string(), "Invalid token: 7");
    assert_eq!(
        DiError::DuplicateBinding("db".into()).to_string(),
        "Token is already registered: db"
    );
    assert_eq!(
        DiError::MissingProvider("db".into()).to_string(),
        "No provider supplied for token: db"
    );
    assert_eq!(
        DiError::ProviderDestroyed("db".into()).to_string(),
        "Provider for token db has been destroyed"
    );
    assert_eq!(DiError::rejected("nope").to_string(), "Operation rejected: nope");
}

#[derive(Debug)]
struct Timeout;

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection timed out")
    }
}

impl Error for Timeout {}

#[test]
fn test_other_is_transparent() {
    let error = DiError::other(Timeout);
    assert_eq!(error.to_string(), "connection timed out");
    assert!(matches!(error, DiError::Other(_)));

    // Clones share the wrapped error
    let copy = error.clone();
    assert_eq!(copy.to_string(), error.to_string());
}

#[test]
fn test_error_is_std_error() {
    fn assert_error<E: Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&DiError::rejected("x"));
}

#[test]
fn test_di_result_propagates() {
    fn lookup(present: bool) -> DiResult<u8> {
        if present {
            Ok(1)
        } else {
            Err(DiError::UnregisteredToken("value".into()))
        }
    }

    fn doubled(present: bool) -> DiResult<u8> {
        Ok(lookup(present)? * 2)
    }

    assert_eq!(doubled(true).unwrap(), 2);
    assert!(doubled(false).unwrap_err().is_unregistered());
}
