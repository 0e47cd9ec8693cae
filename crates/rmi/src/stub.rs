//! Client side proxy for a remote interface.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::address::RemoteAddress;
use crate::interface::{check_remote_interface, RemoteError, RemoteInterface};
use crate::protocol::{
    ConfigError, Failure, InterfaceDescriptor, Request, Response, RmiError, RpcValue, TypeDescriptor,
};
use crate::skeleton::{Skeleton, SkeletonHooks};
use crate::transport::{TcpTransport, TcpTransportAsync};

/// A local stand-in for an object served by a [`Skeleton`].
///
/// A stub is only an address plus the interface it speaks. It holds no
/// connection: every call opens a new one, sends one request, reads one
/// response and closes it. Stubs are cheap to clone and can themselves be
/// passed to or returned from remote operations.
///
/// Equality, hashing and `Display` are answered locally.
pub struct Stub<I: ?Sized + RemoteInterface> {
    address: RemoteAddress,
    descriptor: InterfaceDescriptor,
    _marker: PhantomData<fn(&I)>,
}

impl<I: ?Sized + RemoteInterface> Stub<I> {
    /// Creates a stub for a skeleton listening at `address`.
    pub fn new(address: impl Into<RemoteAddress>) -> Result<Self, ConfigError> {
        let descriptor = I::descriptor();
        check_remote_interface(&descriptor)?;
        Ok(Self {
            address: address.into(),
            descriptor,
            _marker: PhantomData,
        })
    }

    /// Creates a stub for `skeleton`.
    ///
    /// The skeleton must have a concrete address: either configured with a
    /// non-zero port or started at least once. A wildcard address is
    /// replaced by a best-effort local host.
    pub fn for_skeleton<H: SkeletonHooks>(skeleton: &Skeleton<I, H>) -> Result<Self, ConfigError> {
        let addr = skeleton.address().ok_or(ConfigError::AddressNotAssigned)?;
        Self::new(RemoteAddress::advertised(addr))
    }

    /// Like [`for_skeleton`](Self::for_skeleton), advertising `hostname`
    /// instead of the skeleton's own host.
    pub fn for_skeleton_with_host<H: SkeletonHooks>(
        skeleton: &Skeleton<I, H>,
        hostname: &str,
    ) -> Result<Self, ConfigError> {
        if hostname.is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        let addr = skeleton.address().ok_or(ConfigError::AddressNotAssigned)?;
        Self::new(RemoteAddress::new(hostname, addr.port()))
    }

    pub fn address(&self) -> &RemoteAddress {
        &self.address
    }

    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// Performs one remote call.
    ///
    /// Network and decoding failures are reported as `E::from(RmiError)`.
    /// An error returned by the remote implementation is rebuilt with
    /// [`RemoteError::from_failure`].
    pub fn call<T, E>(
        &self,
        operation: &str,
        param_types: Vec<TypeDescriptor>,
        args: Vec<Result<RpcValue, RmiError>>,
    ) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: RemoteError,
    {
        let request = build_request(operation, param_types, args)?;
        tracing::debug!("Calling {} on {}", request.signature(), self.address);

        let mut stream = TcpTransport::connect(&self.address)?;
        let response = TcpTransport::send_request(&mut stream, &request)?;
        complete_call(response)
    }

    /// Untyped call. Errors raised by the target arrive as
    /// [`RmiError::Remote`].
    pub fn invoke(
        &self,
        operation: &str,
        param_types: Vec<TypeDescriptor>,
        args: Vec<RpcValue>,
    ) -> Result<RpcValue, RmiError> {
        self.call(operation, param_types, args.into_iter().map(Ok).collect())
    }

    /// Async variant of [`call`](Self::call) over the tokio transport.
    pub async fn call_async<T, E>(
        &self,
        operation: &str,
        param_types: Vec<TypeDescriptor>,
        args: Vec<Result<RpcValue, RmiError>>,
    ) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: RemoteError,
    {
        let request = build_request(operation, param_types, args)?;
        tracing::debug!("Calling {} on {} (async)", request.signature(), self.address);

        let mut stream = TcpTransportAsync::connect(&self.address).await?;
        let response = TcpTransportAsync::send_request(&mut stream, &request).await?;
        complete_call(response)
    }

    pub async fn invoke_async(
        &self,
        operation: &str,
        param_types: Vec<TypeDescriptor>,
        args: Vec<RpcValue>,
    ) -> Result<RpcValue, RmiError> {
        self.call_async(operation, param_types, args.into_iter().map(Ok).collect())
            .await
    }

    /// Compares against an arbitrary value. Anything that is not a stub of
    /// the same interface is unequal.
    pub fn eq_any(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Stub<I>>()
            .is_some_and(|other| self == other)
    }
}

fn build_request(
    operation: &str,
    param_types: Vec<TypeDescriptor>,
    args: Vec<Result<RpcValue, RmiError>>,
) -> Result<Request, RmiError> {
    let args = args.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(Request::new(operation, param_types, args))
}

fn complete_call<T, E>(response: Response) -> Result<T, E>
where
    T: DeserializeOwned,
    E: RemoteError,
{
    match response.into_result() {
        Ok(value) => serde_json::from_value(value).map_err(|e| {
            E::from(RmiError::Protocol(format!("cannot decode return value: {}", e)))
        }),
        Err(Failure::Application(failure)) => Err(E::from_failure(failure)),
        Err(Failure::Transport(err)) => Err(E::from(err)),
    }
}

impl<I: ?Sized + RemoteInterface> Clone for Stub<I> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            descriptor: self.descriptor.clone(),
            _marker: PhantomData,
        }
    }
}

impl<I, J> PartialEq<Stub<J>> for Stub<I>
where
    I: ?Sized + RemoteInterface,
    J: ?Sized + RemoteInterface,
{
    fn eq(&self, other: &Stub<J>) -> bool {
        self.descriptor == other.descriptor && self.address == other.address
    }
}

impl<I: ?Sized + RemoteInterface> Eq for Stub<I> {}

impl<I: ?Sized + RemoteInterface> Hash for Stub<I> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.address.hash(state);
    }
}

impl<I: ?Sized + RemoteInterface> fmt::Display for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote {} at {}", self.descriptor.name, self.address)
    }
}

impl<I: ?Sized + RemoteInterface> fmt::Debug for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("interface", &self.descriptor.name)
            .field("address", &format_args!("{}", self.address))
            .finish()
    }
}

#[derive(Serialize)]
struct StubRef<'a> {
    interface: &'a str,
    address: &'a RemoteAddress,
}

#[derive(Deserialize)]
struct StubRepr {
    interface: String,
    address: RemoteAddress,
}

impl<I: ?Sized + RemoteInterface> Serialize for Stub<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StubRef {
            interface: &self.descriptor.name,
            address: &self.address,
        }
        .serialize(serializer)
    }
}

impl<'de, I: ?Sized + RemoteInterface> Deserialize<'de> for Stub<I> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = StubRepr::deserialize(deserializer)?;
        let stub = Stub::<I>::new(repr.address).map_err(de::Error::custom)?;
        if stub.descriptor.name != repr.interface {
            return Err(de::Error::custom(format!(
                "stub for {} cannot be read as a stub for {}",
                repr.interface, stub.descriptor.name
            )));
        }
        Ok(stub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Operation;
    use crate::protocol::{FailureKind, OperationDescriptor};
    use std::collections::HashSet;

    trait Echo: Send + Sync {}
    trait Other: Send + Sync {}

    impl RemoteInterface for dyn Echo {
        fn descriptor() -> InterfaceDescriptor {
            InterfaceDescriptor::interface("Echo").operation(OperationDescriptor::new(
                "identity",
                vec![TypeDescriptor::of("i64")],
                TypeDescriptor::of("i64"),
                vec![FailureKind::rmi()],
            ))
        }

        fn operations() -> Vec<Operation<Self>> {
            Vec::new()
        }
    }

    impl RemoteInterface for dyn Other {
        fn descriptor() -> InterfaceDescriptor {
            InterfaceDescriptor::interface("Other")
        }

        fn operations() -> Vec<Operation<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn test_equality_follows_address() {
        let a = Stub::<dyn Echo>::new(("localhost", 7000)).unwrap();
        let b = Stub::<dyn Echo>::new(("localhost", 7000)).unwrap();
        let c = Stub::<dyn Echo>::new(("localhost", 7001)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_different_interfaces_unequal() {
        let echo = Stub::<dyn Echo>::new(("localhost", 7000)).unwrap();
        let other = Stub::<dyn Other>::new(("localhost", 7000)).unwrap();
        assert!(echo != other);
        assert!(!echo.eq_any(&other));
        assert!(!echo.eq_any(&"localhost:7000"));
        assert!(echo.eq_any(&echo.clone()));
    }

    #[test]
    fn test_display_names_interface_and_address() {
        let stub = Stub::<dyn Echo>::new(("10.0.0.5", 4242)).unwrap();
        assert_eq!(stub.to_string(), "remote Echo at 10.0.0.5:4242");
    }

    #[test]
    fn test_serialize_round_trip() {
        let stub = Stub::<dyn Echo>::new(("example.org", 9000)).unwrap();
        let json = serde_json::to_value(&stub).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"interface": "Echo", "address": {"host": "example.org", "port": 9000}})
        );

        let back: Stub<dyn Echo> = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, stub);

        assert!(serde_json::from_value::<Stub<dyn Other>>(json).is_err());
    }
}
