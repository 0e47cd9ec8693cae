use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::address::RemoteAddress;
use crate::protocol::error::{Result, RmiError};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;

/// Largest frame either side accepts by default (100 MB).
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Blocking TCP transport used by stubs and skeleton workers.
///
/// # Wire Protocol
///
/// Every message is a 4-byte big-endian length followed by the JSON body:
///
/// ```text
/// [4-byte length] [JSON data]
/// ```
///
/// A connection carries exactly one request and one response. No timeouts
/// are configured: a peer that never answers blocks the caller.
pub struct TcpTransport;

impl TcpTransport {
    /// Opens a fresh connection, trying every address the host resolves to.
    pub fn connect(addr: &RemoteAddress) -> Result<TcpStream> {
        let socket_addrs = (addr.host(), addr.port())
            .to_socket_addrs()
            .map_err(|e| RmiError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(RmiError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "address resolved to nothing".to_string())
        )))
    }

    /// Writes one request and reads back its response.
    pub fn send_request(stream: &mut TcpStream, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        Self::send_message(stream, &encoded)?;
        let data = Self::receive_message(stream, MAX_MESSAGE_SIZE)?;
        JsonCodec::decode_response(&data)
    }

    /// Sends a message with length prefix.
    pub fn send_message<W: Write>(stream: &mut W, data: &[u8]) -> Result<()> {
        let len = frame_len(data)?;
        stream
            .write_all(&len.to_be_bytes())
            .map_err(|e| map_io_error(e, "writing length prefix"))?;
        stream
            .write_all(data)
            .map_err(|e| map_io_error(e, "writing data"))?;
        stream
            .flush()
            .map_err(|e| map_io_error(e, "flushing stream"))?;
        Ok(())
    }

    /// Receives a message with length prefix, refusing frames over `max_len`.
    pub fn receive_message<R: Read>(stream: &mut R, max_len: usize) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .map_err(|e| map_io_error(e, "reading length prefix"))?;

        let len = checked_len(len_buf, max_len)?;
        let mut buf = vec![0u8; len];
        stream
            .read_exact(&mut buf)
            .map_err(|e| map_io_error(e, "reading data"))?;
        Ok(buf)
    }
}

/// Async TCP transport, same wire protocol as [`TcpTransport`].
///
/// Used by [`Stub::call_async`](crate::Stub::call_async) so callers already
/// inside a tokio runtime do not block a worker thread.
pub struct TcpTransportAsync;

impl TcpTransportAsync {
    pub async fn connect(addr: &RemoteAddress) -> Result<tokio::net::TcpStream> {
        tokio::net::TcpStream::connect((addr.host(), addr.port()))
            .await
            .map_err(|e| RmiError::Connection(format!("Failed to connect to {}: {}", addr, e)))
    }

    pub async fn send_request(stream: &mut tokio::net::TcpStream, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        Self::send_message(stream, &encoded).await?;
        let data = Self::receive_message(stream, MAX_MESSAGE_SIZE).await?;
        JsonCodec::decode_response(&data)
    }

    pub async fn send_message<W: AsyncWrite + Unpin>(stream: &mut W, data: &[u8]) -> Result<()> {
        let len = frame_len(data)?;
        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| map_io_error(e, "writing length prefix"))?;
        stream
            .write_all(data)
            .await
            .map_err(|e| map_io_error(e, "writing data"))?;
        stream
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing stream"))?;
        Ok(())
    }

    pub async fn receive_message<R: AsyncRead + Unpin>(stream: &mut R, max_len: usize) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| map_io_error(e, "reading length prefix"))?;

        let len = checked_len(len_buf, max_len)?;
        let mut buf = vec![0u8; len];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| map_io_error(e, "reading data"))?;
        Ok(buf)
    }
}

fn frame_len(data: &[u8]) -> Result<u32> {
    u32::try_from(data.len())
        .map_err(|_| RmiError::Protocol(format!("Message too large to frame: {} bytes", data.len())))
}

fn checked_len(len_buf: [u8; 4], max_len: usize) -> Result<usize> {
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_len {
        return Err(RmiError::Protocol(format!(
            "Message too large: {} bytes (max {} bytes)",
            len, max_len
        )));
    }
    Ok(len)
}

/// Maps IO errors onto the transport failure kind.
///
/// - Peer went away -> `Connection`
/// - Anything else -> `Io`
fn map_io_error(err: std::io::Error, context: &str) -> RmiError {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::UnexpectedEof => RmiError::Connection(format!("{}: connection closed by peer", context)),
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => RmiError::Connection(format!("{}: connection lost", context)),
        _ => RmiError::Io(format!("{}: {}", context, err)),
    }
}
