//! Interface descriptions used for validation, dispatch and stub identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::RmiError;
use super::requests::{Signature, TypeDescriptor};

/// Name of a failure kind an operation may produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureKind(String);

impl FailureKind {
    pub fn new(name: impl Into<String>) -> Self {
        FailureKind(name.into())
    }

    /// The RPC failure kind every remote operation must declare.
    pub fn rmi() -> Self {
        FailureKind(RmiError::KIND.to_string())
    }

    pub fn of<E: ?Sized>() -> Self {
        FailureKind(std::any::type_name::<E>().to_string())
    }

    pub fn is_rmi(&self) -> bool {
        self.0 == RmiError::KIND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// An abstract capability set; the only kind that can be remote.
    Interface,
    /// A concrete type. Never a remote interface.
    Concrete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub param_types: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
    pub failures: Vec<FailureKind>,
}

impl OperationDescriptor {
    pub fn new(
        name: impl Into<String>,
        param_types: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
        failures: Vec<FailureKind>,
    ) -> Self {
        Self {
            name: name.into(),
            param_types,
            return_type,
            failures,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::new(self.name.clone(), self.param_types.clone())
    }

    pub fn declares_rmi_failure(&self) -> bool {
        self.failures.iter().any(FailureKind::is_rmi)
    }
}

/// Identity and full ordered operation set of an interface.
///
/// # Example
///
/// ```
/// use rmi::protocol::{FailureKind, InterfaceDescriptor, OperationDescriptor, TypeDescriptor};
///
/// let descriptor = InterfaceDescriptor::interface("Echo").operation(OperationDescriptor::new(
///     "identity",
///     vec![TypeDescriptor::of("i64")],
///     TypeDescriptor::of("i64"),
///     vec![FailureKind::rmi()],
/// ));
/// assert_eq!(descriptor.operations.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub kind: DescriptorKind,
    pub operations: Vec<OperationDescriptor>,
}

impl InterfaceDescriptor {
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Interface,
            operations: Vec::new(),
        }
    }

    pub fn concrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Concrete,
            operations: Vec::new(),
        }
    }

    pub fn operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn find(&self, signature: &Signature) -> Option<&OperationDescriptor> {
        self.operations
            .iter()
            .find(|op| op.name == signature.name && op.param_types == signature.param_types)
    }
}
