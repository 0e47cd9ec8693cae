//! Remote interfaces and their dispatch tables.
//!
//! A remote interface is a trait object type (`dyn Trait`) implementing
//! [`RemoteInterface`]. It describes itself with an [`InterfaceDescriptor`]
//! and lists one [`Operation`] per method: the signature plus a plain
//! function that decodes arguments, calls the method on the target and
//! encodes the outcome. [`remote_interface!`](crate::remote_interface)
//! generates both.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::protocol::{
    ApplicationFailure, ConfigError, DescriptorKind, FailureKind, InterfaceDescriptor, RmiError,
    RpcValue, Signature, TypeDescriptor,
};

/// Implemented for `dyn Trait` of every remote interface.
pub trait RemoteInterface: Send + Sync + 'static {
    fn descriptor() -> InterfaceDescriptor;

    fn operations() -> Vec<Operation<Self>>;
}

/// Error types remote operations may return.
///
/// `From<RmiError>` is what makes every remote call site fallible for
/// network reasons. The remaining bounds let the error cross the wire.
///
/// Implementing it is usually a few lines:
///
/// ```
/// use rmi::{RemoteError, RmiError};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
/// enum LookupError {
///     #[error("no entry named {0}")]
///     Missing(String),
///     #[error(transparent)]
///     Rmi(#[from] RmiError),
/// }
///
/// impl RemoteError for LookupError {
///     fn as_rmi(&self) -> Option<&RmiError> {
///         match self {
///             LookupError::Rmi(err) => Some(err),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait RemoteError: From<RmiError> + Serialize + DeserializeOwned + fmt::Display + Sized {
    fn failure_kinds() -> Vec<FailureKind> {
        vec![FailureKind::rmi(), FailureKind::of::<Self>()]
    }

    /// The RPC failure this error wraps, if any.
    ///
    /// Implement it for the variant built by `From<RmiError>`. The server
    /// then knows that such an error came from the target, for instance a
    /// call it forwarded to another stub, and the caller receives it as
    /// `RmiError::Remote` instead of a local network failure.
    fn as_rmi(&self) -> Option<&RmiError> {
        None
    }

    /// Server side: packs the error raised by the target.
    fn to_failure(&self) -> ApplicationFailure {
        match self.as_rmi() {
            None | Some(RmiError::Remote(_)) => ApplicationFailure::capture(self),
            Some(inner) => {
                let wrapped = Self::from(RmiError::Remote(ApplicationFailure::capture(inner)));
                ApplicationFailure::capture(&wrapped)
            }
        }
    }

    /// Client side: rebuilds the error raised by the target. A failure that
    /// cannot be rebuilt as `Self` is kept as `RmiError::Remote`.
    fn from_failure(failure: ApplicationFailure) -> Self {
        match failure.restore::<Self>() {
            Ok(error) => error,
            Err(err) => {
                tracing::debug!("{}", err);
                Self::from(RmiError::Remote(failure))
            }
        }
    }
}

impl RemoteError for RmiError {
    fn failure_kinds() -> Vec<FailureKind> {
        vec![FailureKind::rmi()]
    }

    fn as_rmi(&self) -> Option<&RmiError> {
        Some(self)
    }

    fn to_failure(&self) -> ApplicationFailure {
        match self {
            RmiError::Remote(failure) => failure.clone(),
            other => ApplicationFailure::capture(other),
        }
    }

    /// Always wrapped, so a failure raised by the target never reads as a
    /// local transport failure.
    fn from_failure(failure: ApplicationFailure) -> Self {
        RmiError::Remote(failure)
    }
}

/// True iff `descriptor` is an interface whose every operation declares
/// the RPC failure kind.
pub fn is_remote_interface(descriptor: &InterfaceDescriptor) -> bool {
    check_remote_interface(descriptor).is_ok()
}

pub fn check_remote_interface(descriptor: &InterfaceDescriptor) -> Result<(), ConfigError> {
    if descriptor.kind != DescriptorKind::Interface {
        return Err(ConfigError::NotRemoteInterface {
            interface: descriptor.name.clone(),
            reason: "not an interface".to_string(),
        });
    }
    if let Some(op) = descriptor.operations.iter().find(|op| !op.declares_rmi_failure()) {
        return Err(ConfigError::NotRemoteInterface {
            interface: descriptor.name.clone(),
            reason: format!("{} does not declare {}", op.signature(), RmiError::KIND),
        });
    }
    Ok(())
}

/// Why a dispatched call produced no value.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchFailure {
    /// The target returned an error.
    Application(ApplicationFailure),
    /// Arguments or return value could not be converted.
    Rmi(RmiError),
}

impl From<RmiError> for DispatchFailure {
    fn from(err: RmiError) -> Self {
        DispatchFailure::Rmi(err)
    }
}

pub type Handler<I> = fn(&I, Vec<RpcValue>) -> Result<RpcValue, DispatchFailure>;

/// One dispatchable operation of interface `I`.
pub struct Operation<I: ?Sized> {
    signature: Signature,
    handler: Handler<I>,
}

impl<I: ?Sized> Operation<I> {
    pub fn new(name: &str, param_types: Vec<TypeDescriptor>, handler: Handler<I>) -> Self {
        Self {
            signature: Signature::new(name, param_types),
            handler,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn invoke(&self, target: &I, args: Vec<RpcValue>) -> Result<RpcValue, DispatchFailure> {
        (self.handler)(target, args)
    }
}

/// Converts a method's outcome into the dispatch result.
pub fn complete<T, E>(outcome: Result<T, E>) -> Result<RpcValue, DispatchFailure>
where
    T: Serialize,
    E: RemoteError,
{
    match outcome {
        Ok(value) => serde_json::to_value(value)
            .map_err(|e| DispatchFailure::Rmi(RmiError::Protocol(format!("cannot encode return value: {}", e)))),
        Err(error) => Err(DispatchFailure::Application(error.to_failure())),
    }
}

/// Signature-keyed dispatch table built once per skeleton.
pub struct OperationRegistry<I: ?Sized> {
    operations: HashMap<Signature, Operation<I>>,
}

impl<I: ?Sized + RemoteInterface> OperationRegistry<I> {
    /// Registers the operations `I` declares. Anything not in the
    /// descriptor is left out.
    pub fn for_interface(descriptor: &InterfaceDescriptor) -> Self {
        let mut operations = HashMap::new();
        for op in I::operations() {
            if descriptor.find(op.signature()).is_some() {
                operations.insert(op.signature().clone(), op);
            } else {
                tracing::warn!(
                    "{}: skipping undeclared operation {}",
                    descriptor.name,
                    op.signature()
                );
            }
        }
        Self { operations }
    }
}

impl<I: ?Sized> OperationRegistry<I> {
    pub fn lookup(&self, signature: &Signature) -> Option<&Operation<I>> {
        self.operations.get(signature)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
