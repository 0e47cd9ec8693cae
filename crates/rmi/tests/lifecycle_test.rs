//! Skeleton Lifecycle Tests
//!
//! Start/stop transitions, address assignment and rebinding.

mod common;

use common::*;
use rmi::{ConfigError, RmiError, Skeleton, SkeletonConfig, Stub};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

fn loopback_any() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

#[test]
fn test_start_twice_fails() {
    let (skeleton, _stub) = start_mirror();
    assert!(skeleton.is_running());

    let err = skeleton.start().unwrap_err();
    assert!(matches!(err, RmiError::AlreadyRunning(_)));
    assert!(skeleton.is_running());
}

#[test]
fn test_stop_is_idempotent() {
    let skeleton = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), loopback_any()).unwrap();
    skeleton.stop();

    skeleton.start().unwrap();
    skeleton.stop();
    skeleton.stop();
    assert!(!skeleton.is_running());
}

#[test]
fn test_restart_reuses_assigned_port() {
    let (skeleton, stub) = start_mirror();
    let first = skeleton.address().unwrap();
    assert_ne!(first.port(), 0);

    skeleton.stop();
    assert!(TcpStream::connect(first).is_err());

    skeleton.start().unwrap();
    assert_eq!(skeleton.address(), Some(first));
    assert_eq!(stub.identity(21).unwrap(), 21);
}

#[test]
fn test_address_free_after_stop() {
    let (skeleton, _stub) = start_mirror();
    let addr = skeleton.address().unwrap();
    skeleton.stop();

    let replacement = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), addr).unwrap();
    replacement.start().unwrap();

    let stub = Stub::<dyn Echo>::for_skeleton(&replacement).unwrap();
    assert_eq!(stub.identity(3).unwrap(), 3);
}

#[test]
fn test_bind_conflict_reported() {
    let (running, _stub) = start_mirror();
    let addr = running.address().unwrap();

    let second = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), addr).unwrap();
    match second.start() {
        Err(RmiError::Bind { address, .. }) => assert_eq!(address, addr.to_string()),
        other => panic!("Expected bind error, got {:?}", other),
    }
    assert!(!second.is_running());
}

#[test]
fn test_drop_stops_skeleton() {
    let (skeleton, stub) = start_mirror();
    let addr = skeleton.address().unwrap();
    drop(skeleton);

    assert!(TcpStream::connect(addr).is_err());
    assert!(matches!(stub.identity(1), Err(RmiError::Connection(_))));
}

#[test]
fn test_stub_needs_assigned_address() {
    let skeleton = Skeleton::<dyn Echo>::new(Arc::new(Mirror)).unwrap();
    assert_eq!(
        Stub::<dyn Echo>::for_skeleton(&skeleton).unwrap_err(),
        ConfigError::AddressNotAssigned
    );
    assert_eq!(
        Stub::<dyn Echo>::for_skeleton_with_host(&skeleton, "localhost").unwrap_err(),
        ConfigError::AddressNotAssigned
    );
}

#[test]
fn test_stub_from_configured_address_before_start() {
    let addr: SocketAddr = "127.0.0.1:45123".parse().unwrap();
    let skeleton = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), addr).unwrap();

    let stub = Stub::<dyn Echo>::for_skeleton(&skeleton).unwrap();
    assert_eq!(stub.address().to_string(), "127.0.0.1:45123");
}

#[test]
fn test_hostname_override() {
    let (skeleton, _stub) = start_mirror();
    let port = skeleton.address().unwrap().port();

    assert_eq!(
        Stub::<dyn Echo>::for_skeleton_with_host(&skeleton, "").unwrap_err(),
        ConfigError::EmptyHostname
    );

    let stub = Stub::<dyn Echo>::for_skeleton_with_host(&skeleton, "localhost").unwrap();
    assert_eq!(stub.address().host(), "localhost");
    assert_eq!(stub.address().port(), port);
    assert_eq!(stub.identity(8).unwrap(), 8);
}

#[test]
fn test_wildcard_address_is_advertised_as_concrete_host() {
    let config = SkeletonConfig::new().with_address("0.0.0.0:0".parse().unwrap());
    let skeleton = Skeleton::<dyn Echo, _>::with_hooks(Arc::new(Mirror), config, rmi::DefaultHooks).unwrap();
    skeleton.start().unwrap();

    let stub = Stub::<dyn Echo>::for_skeleton(&skeleton).unwrap();
    assert_ne!(stub.address().host(), "0.0.0.0");
    assert_eq!(stub.identity(55).unwrap(), 55);
}

#[test]
fn test_small_max_message_size_drops_large_requests() {
    let config = SkeletonConfig::new()
        .with_address(loopback_any())
        .with_max_message_size(128);
    let skeleton = Skeleton::<dyn Echo, _>::with_hooks(Arc::new(Mirror), config, rmi::DefaultHooks).unwrap();
    skeleton.start().unwrap();
    let stub = Stub::<dyn Echo>::for_skeleton(&skeleton).unwrap();

    assert_eq!(stub.identity(1).unwrap(), 1);
    assert!(matches!(
        stub.identity_text("x".repeat(1024)),
        Err(RmiError::Connection(_))
    ));
}
