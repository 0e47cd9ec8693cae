//! RMI Response Types
//!
//! A response carries exactly one outcome of one invocation.

use serde::{Deserialize, Serialize};

use super::error::{ApplicationFailure, RmiError};
use super::requests::RpcValue;

/// Why an invocation produced no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    /// The implementation object returned an error.
    Application(ApplicationFailure),
    /// Dispatch could not proceed.
    Transport(RmiError),
}

/// The one result of one invocation.
///
/// # Wire shape
///
/// ```text
/// {"return": 42}
/// {"failure": {"application": {"kind": "..", "message": "..", "detail": ..}}}
/// {"failure": {"transport": {"no_such_operation": "ping(u8)"}}}
/// ```
///
/// # Example
///
/// ```
/// use rmi::protocol::{Response, RmiError};
/// use serde_json::json;
///
/// let ok = Response::value(json!("pong"));
/// assert_eq!(ok.into_result().unwrap(), json!("pong"));
///
/// let lost = Response::transport(RmiError::NoSuchOperation("ping()".into()));
/// assert!(lost.into_result().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Return(RpcValue),
    Failure(Failure),
}

impl Response {
    pub fn value(value: RpcValue) -> Self {
        Response::Return(value)
    }

    pub fn application(failure: ApplicationFailure) -> Self {
        Response::Failure(Failure::Application(failure))
    }

    pub fn transport(error: RmiError) -> Self {
        Response::Failure(Failure::Transport(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Return(_))
    }

    /// Returns the value, or the failure this response carries.
    pub fn into_result(self) -> std::result::Result<RpcValue, Failure> {
        match self {
            Response::Return(value) => Ok(value),
            Response::Failure(failure) => Err(failure),
        }
    }
}
