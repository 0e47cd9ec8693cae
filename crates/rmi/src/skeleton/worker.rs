use std::any::Any;
use std::net::{SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};

use super::{Shared, SkeletonHooks};
use crate::interface::{DispatchFailure, RemoteInterface};
use crate::protocol::{Request, Response, RmiError};
use crate::transport::{JsonCodec, TcpTransport};

/// Serves one connection: one request in, one response out.
///
/// Failures that leave nobody to answer (unreadable frames, a peer that
/// hung up) go to `on_service_error` and the connection is dropped.
pub(crate) fn handle_connection<I, H>(mut stream: TcpStream, peer_addr: SocketAddr, shared: &Shared<I, H>)
where
    I: ?Sized + RemoteInterface,
    H: SkeletonHooks,
{
    let request = match read_request(&mut stream, shared.max_message_size) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!("Dropping connection from {}: {}", peer_addr, err);
            shared.hooks.on_service_error(&err);
            return;
        }
    };

    let response = dispatch(shared, request);

    let sent = JsonCodec::encode_response(&response)
        .and_then(|encoded| TcpTransport::send_message(&mut stream, &encoded));
    if let Err(err) = sent {
        tracing::debug!("Failed to answer {}: {}", peer_addr, err);
        shared.hooks.on_service_error(&err);
    }
}

fn read_request(stream: &mut TcpStream, max_len: usize) -> crate::protocol::Result<Request> {
    let data = TcpTransport::receive_message(stream, max_len)?;
    JsonCodec::decode_request(&data)
}

/// Resolves the request against the registry and runs it on the target.
pub(crate) fn dispatch<I, H>(shared: &Shared<I, H>, request: Request) -> Response
where
    I: ?Sized + RemoteInterface,
    H: SkeletonHooks,
{
    let (signature, args) = request.into_parts();

    let Some(operation) = shared.registry.lookup(&signature) else {
        let err = RmiError::NoSuchOperation(signature.to_string());
        shared.hooks.on_service_error(&err);
        return Response::transport(err);
    };

    tracing::debug!("Dispatching {}.{}", shared.interface, signature);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation.invoke(&*shared.target, args)));
    match outcome {
        Ok(Ok(value)) => Response::value(value),
        Ok(Err(DispatchFailure::Application(failure))) => Response::application(failure),
        Ok(Err(DispatchFailure::Rmi(err))) => {
            shared.hooks.on_service_error(&err);
            Response::transport(err)
        }
        Err(payload) => {
            let err = RmiError::TargetPanicked {
                operation: signature.to_string(),
                message: panic_message(payload.as_ref()),
            };
            shared.hooks.on_service_error(&err);
            Response::transport(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
