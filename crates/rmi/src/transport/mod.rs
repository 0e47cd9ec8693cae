//! RMI Transport Layer
//!
//! Encoding of invocations and their framing over TCP.
//!
//! # Architecture
//!
//! - **Codec**: JSON serialization for protocol messages
//! - **Wire Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//! - **Connection scope**: one request and one response, then both sides close
//!
//! # Components
//!
//! - **[`JsonCodec`]**: Encode/decode requests and responses
//! - **[`TcpTransport`]**: Blocking transport (stubs, skeleton workers)
//! - **[`TcpTransportAsync`]**: tokio transport (async stub calls)

pub mod codec;
pub mod tcp;

pub use codec::JsonCodec;
pub use tcp::{TcpTransport, TcpTransportAsync, MAX_MESSAGE_SIZE};
