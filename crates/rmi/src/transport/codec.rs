use crate::protocol::error::{Result, RmiError};
use crate::protocol::{Request, Response};

/// JSON codec for invocation requests and responses.
///
/// Decoding a request also checks that every argument has a type descriptor,
/// so a skeleton never dispatches on a half-described signature.
///
/// # Example
///
/// ```
/// use rmi::transport::JsonCodec;
/// use rmi::protocol::{Request, Response, TypeDescriptor};
/// use serde_json::json;
///
/// let request = Request::new("identity", vec![TypeDescriptor::of("i64")], vec![json!(-1)]);
/// let encoded = JsonCodec::encode_request(&request).unwrap();
/// assert_eq!(JsonCodec::decode_request(&encoded).unwrap(), request);
///
/// let response = Response::value(json!(-1));
/// let encoded = JsonCodec::encode_response(&response).unwrap();
/// assert_eq!(JsonCodec::decode_response(&encoded).unwrap(), response);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    pub fn decode_request(data: &[u8]) -> Result<Request> {
        let request: Request = serde_json::from_slice(data)?;
        if request.param_types.len() != request.args.len() {
            return Err(RmiError::Protocol(format!(
                "{}: {} parameter types for {} arguments",
                request.operation,
                request.param_types.len(),
                request.args.len()
            )));
        }
        Ok(request)
    }

    pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    pub fn decode_response(data: &[u8]) -> Result<Response> {
        Ok(serde_json::from_slice(data)?)
    }
}
