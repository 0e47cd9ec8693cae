pub mod descriptors;
pub mod error;
pub mod requests;
pub mod responses;


pub use descriptors::{DescriptorKind, FailureKind, InterfaceDescriptor, OperationDescriptor};
pub use error::{ApplicationFailure, ConfigError, Result, RmiError};
pub use requests::{to_argument, Arguments, Request, RpcValue, Signature, TypeDescriptor};
pub use responses::{Failure, Response};
