use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{Result, RmiError};

/// Argument and return values travel as JSON.
pub type RpcValue = serde_json::Value;

/// Name of a parameter or return type, as written in the interface
/// declaration with all whitespace removed (`Vec < u8 >` becomes `Vec<u8>`).
///
/// Descriptors are compared textually; the skeleton resolves operations by
/// exact match on name plus the ordered list of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeDescriptor(String);

impl TypeDescriptor {
    pub fn of(name: &str) -> Self {
        TypeDescriptor(name.chars().filter(|c| !c.is_whitespace()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation name plus ordered parameter types. Key of the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub param_types: Vec<TypeDescriptor>,
}

impl Signature {
    pub fn new(name: impl Into<String>, param_types: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            param_types,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, ty) in self.param_types.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}

/// One method invocation, built fresh per call on the client and consumed
/// once by the skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub operation: String,
    pub param_types: Vec<TypeDescriptor>,
    pub args: Vec<RpcValue>,
}

impl Request {
    pub fn new(operation: impl Into<String>, param_types: Vec<TypeDescriptor>, args: Vec<RpcValue>) -> Self {
        Request {
            operation: operation.into(),
            param_types,
            args,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature::new(self.operation.clone(), self.param_types.clone())
    }

    /// Splits the request into its dispatch key and argument values.
    pub fn into_parts(self) -> (Signature, Vec<RpcValue>) {
        (Signature::new(self.operation, self.param_types), self.args)
    }
}

/// Converts one argument to its wire value.
pub fn to_argument<T: Serialize + ?Sized>(value: &T) -> Result<RpcValue> {
    serde_json::to_value(value)
        .map_err(|e| RmiError::Protocol(format!("cannot encode argument: {}", e)))
}

/// Positional reader over the argument values of one request.
pub struct Arguments {
    operation: &'static str,
    values: std::vec::IntoIter<RpcValue>,
    position: usize,
}

impl Arguments {
    pub fn new(operation: &'static str, values: Vec<RpcValue>) -> Self {
        Self {
            operation,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Reads the next argument as `T`.
    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T> {
        let position = self.position;
        self.position += 1;
        let value = self.values.next().ok_or_else(|| {
            RmiError::Protocol(format!("{}: missing argument {}", self.operation, position))
        })?;
        serde_json::from_value(value).map_err(|e| {
            RmiError::Protocol(format!("{}: argument {}: {}", self.operation, position, e))
        })
    }

    /// Fails if arguments remain unread.
    pub fn finish(self) -> Result<()> {
        let extra = self.values.len();
        if extra == 0 {
            Ok(())
        } else {
            Err(RmiError::Protocol(format!(
                "{}: {} unexpected trailing argument(s)",
                self.operation, extra
            )))
        }
    }
}
