//! RMI Error Types
//!
//! Three kinds of failure are kept apart:
//!
//! - [`ConfigError`]: raised while building a stub or skeleton, before any
//!   socket is touched.
//! - [`RmiError`]: the transport failure kind. Connection problems, malformed
//!   frames, unknown operations and lifecycle violations.
//! - [`ApplicationFailure`]: whatever the remote implementation object itself
//!   returned as an error. It travels inside a response and is rebuilt on the
//!   client as the original error value.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of the RPC mechanism itself.
///
/// `RmiError` is serializable so that a skeleton can send it back to the
/// stub when dispatch cannot proceed (for example, no matching operation).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RmiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No such operation: {0}")]
    NoSuchOperation(String),

    #[error("Skeleton is already running on {0}")]
    AlreadyRunning(String),

    #[error("Failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("Failed to spawn thread: {0}")]
    Spawn(String),

    #[error("Remote operation {operation} panicked: {message}")]
    TargetPanicked { operation: String, message: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Remote target raised {0}")]
    Remote(ApplicationFailure),
}

impl RmiError {
    /// Name of the RPC failure kind in interface descriptors.
    pub const KIND: &'static str = "RmiError";

    /// Whether this error originated in the remote implementation rather
    /// than in the network or the framework.
    pub fn is_remote(&self) -> bool {
        matches!(self, RmiError::Remote(_))
    }
}

impl From<std::io::Error> for RmiError {
    fn from(err: std::io::Error) -> Self {
        RmiError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RmiError {
    fn from(err: serde_json::Error) -> Self {
        RmiError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RmiError>;

/// Errors raised while constructing stubs and skeletons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{interface} is not a remote interface: {reason}")]
    NotRemoteInterface { interface: String, reason: String },

    #[error("Skeleton has not been assigned an address and has not been started")]
    AddressNotAssigned,

    #[error("Hostname override must not be empty")]
    EmptyHostname,
}

/// An error raised by the remote implementation object.
///
/// `kind` names the concrete error type, `message` is its display form and
/// `detail` is its serialized value, from which the stub rebuilds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFailure {
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ApplicationFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            detail: serde_json::Value::Null,
        }
    }

    /// Captures an error value so it can cross the wire.
    pub fn capture<E>(error: &E) -> Self
    where
        E: Serialize + fmt::Display,
    {
        let kind = std::any::type_name::<E>().to_string();
        let detail = serde_json::to_value(error).unwrap_or_else(|e| {
            tracing::warn!("Cannot serialize remote failure {}: {}", kind, e);
            serde_json::Value::Null
        });
        Self {
            kind,
            message: error.to_string(),
            detail,
        }
    }

    /// Rebuilds the original error value from `detail`.
    pub fn restore<E>(&self) -> Result<E>
    where
        E: serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.detail.clone()).map_err(|e| {
            RmiError::Protocol(format!(
                "cannot rebuild remote failure {} ({}): {}",
                self.kind, self.message, e
            ))
        })
    }
}

impl fmt::Display for ApplicationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
