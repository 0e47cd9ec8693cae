//! Remote-Interface Validation and Stub Value Semantics

mod common;

use common::*;
use rmi::interface::Operation;
use rmi::protocol::{FailureKind, InterfaceDescriptor, OperationDescriptor, TypeDescriptor};
use rmi::{is_remote_interface, ConfigError, RemoteInterface, Skeleton, Stub};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An interface whose `read` cannot report RPC failures.
trait Unreliable: Send + Sync {
    fn read(&self) -> Result<u8, std::io::Error>;
}

impl RemoteInterface for dyn Unreliable {
    fn descriptor() -> InterfaceDescriptor {
        InterfaceDescriptor::interface("Unreliable").operation(OperationDescriptor::new(
            "read",
            vec![],
            TypeDescriptor::of("u8"),
            vec![FailureKind::new("std::io::Error")],
        ))
    }

    fn operations() -> Vec<Operation<Self>> {
        Vec::new()
    }
}

struct Disk;

impl Unreliable for Disk {
    fn read(&self) -> Result<u8, std::io::Error> {
        Ok(0)
    }
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_declared_interfaces_are_remote() {
    let echo = <dyn Echo as RemoteInterface>::descriptor();
    assert!(is_remote_interface(&echo));
    assert_eq!(echo.operations.len(), 7);

    let non_negative = echo.operations.iter().find(|op| op.name == "non_negative").unwrap();
    assert!(non_negative.declares_rmi_failure());
    assert!(non_negative
        .failures
        .iter()
        .any(|kind| kind.as_str().ends_with("EchoError")));

    let list = echo.operations.iter().find(|op| op.name == "identity_list").unwrap();
    assert_eq!(list.param_types, vec![TypeDescriptor::of("Vec<i64>")]);
}

#[test]
fn test_stub_rejects_non_remote_interface() {
    let err = Stub::<dyn Unreliable>::new(("127.0.0.1", 1)).unwrap_err();
    assert!(matches!(err, ConfigError::NotRemoteInterface { ref interface, .. } if interface == "Unreliable"));
}

#[test]
fn test_skeleton_rejects_non_remote_interface() {
    let target: Arc<dyn Unreliable> = Arc::new(Disk);
    let err = Skeleton::<dyn Unreliable>::bind(target, "127.0.0.1:0".parse().unwrap())
        .err()
        .unwrap();
    match err {
        ConfigError::NotRemoteInterface { interface, reason } => {
            assert_eq!(interface, "Unreliable");
            assert!(reason.contains("read()"));
        }
        other => panic!("Expected NotRemoteInterface, got {:?}", other),
    }
}

#[test]
fn test_equal_stubs_hash_alike() {
    let a = Stub::<dyn Echo>::new(("127.0.0.1", 9100)).unwrap();
    let b = Stub::<dyn Echo>::new(("127.0.0.1", 9100)).unwrap();

    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
    assert_eq!(a.to_string(), "remote Echo at 127.0.0.1:9100");
}

#[test]
fn test_stub_unequal_to_other_values() {
    let echo = Stub::<dyn Echo>::new(("127.0.0.1", 9100)).unwrap();
    let factory = Stub::<dyn EchoFactory>::new(("127.0.0.1", 9100)).unwrap();

    assert!(echo != factory);
    assert!(!echo.eq_any(&factory));
    assert!(!echo.eq_any(&42));
    assert!(!echo.eq_any(&"remote Echo at 127.0.0.1:9100".to_string()));
}

#[test]
fn test_stub_comparison_touches_no_network() {
    // Nothing listens on port 1; equality and hashing still answer.
    let a = Stub::<dyn Echo>::new(("127.0.0.1", 1)).unwrap();
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}
