//! RMI: Remote Method Invocation over TCP
//!
//! This crate lets a program call methods on an object that lives in another
//! process as if it were local.
//!
//! # Overview
//!
//! - A **remote interface** is a trait declared with [`remote_interface!`].
//!   Every method returns `Result<T, E>` where `E` can represent an RPC
//!   failure ([`RemoteError`]).
//! - A **[`Skeleton`]** serves an implementation object on a TCP address,
//!   one thread per connection.
//! - A **[`Stub`]** implements the same trait on the client side. Each call
//!   opens a connection, sends one [`Request`], reads one [`Response`] and
//!   closes it.
//!
//! # Architecture
//!
//! - **Transport**: TCP, one invocation per connection
//! - **Serialization**: JSON
//! - **Message Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//! - **Max Message Size**: 100 MB by default
//!
//! # Components
//!
//! - [`protocol`] - Requests, responses, descriptors and the error taxonomy
//! - [`transport`] - Codec and TCP framing
//! - [`interface`] - Remote-interface validation and dispatch tables
//!
//! # Example
//!
//! ```no_run
//! use rmi::{remote_interface, RmiError, Skeleton, Stub};
//! use std::sync::Arc;
//!
//! remote_interface! {
//!     pub trait Greeter {
//!         fn greet(&self, name: String) -> Result<String, RmiError>;
//!     }
//! }
//!
//! struct Polite;
//!
//! impl Greeter for Polite {
//!     fn greet(&self, name: String) -> Result<String, RmiError> {
//!         Ok(format!("Hello, {}", name))
//!     }
//! }
//!
//! let skeleton = Skeleton::<dyn Greeter>::new(Arc::new(Polite)).unwrap();
//! skeleton.start().unwrap();
//!
//! let stub = Stub::<dyn Greeter>::for_skeleton(&skeleton).unwrap();
//! assert_eq!(stub.greet("Ada".to_string()).unwrap(), "Hello, Ada");
//! ```

mod address;
pub mod interface;
mod macros;
pub mod protocol;
mod skeleton;
mod stub;
pub mod transport;

pub use address::RemoteAddress;
pub use interface::{check_remote_interface, is_remote_interface, Operation, OperationRegistry, RemoteError, RemoteInterface};
pub use protocol::*;
pub use skeleton::{DefaultHooks, Skeleton, SkeletonConfig, SkeletonHooks};
pub use stub::Stub;
