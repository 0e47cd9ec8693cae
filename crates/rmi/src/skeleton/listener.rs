use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::worker;
use super::{Shared, SkeletonHooks};
use crate::interface::RemoteInterface;
use crate::protocol::RmiError;

const WAKE_ATTEMPTS: u32 = 5;
const WAKE_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Unblocks a pending `accept` from another thread. Returns `false` if it
/// could not.
pub(crate) type Waker = Box<dyn Fn() -> bool + Send>;

/// Where the accept loop takes its connections from.
pub(crate) trait Acceptor: Send + 'static {
    fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;

    fn waker(&self, local_addr: SocketAddr) -> Waker;
}

impl Acceptor for TcpListener {
    fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self)
    }

    /// Connects to the listener, retrying a few times with a bounded
    /// connect so a full backlog cannot stall the caller.
    fn waker(&self, local_addr: SocketAddr) -> Waker {
        let ip = match local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        let target = SocketAddr::new(ip, local_addr.port());

        Box::new(move || {
            for attempt in 1..=WAKE_ATTEMPTS {
                match TcpStream::connect_timeout(&target, WAKE_CONNECT_TIMEOUT) {
                    Ok(_) => return true,
                    Err(e) => {
                        tracing::warn!(
                            "Failed to wake accept loop on {} (attempt {}/{}): {}",
                            target,
                            attempt,
                            WAKE_ATTEMPTS,
                            e
                        );
                        if attempt < WAKE_ATTEMPTS {
                            thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
                        }
                    }
                }
            }
            false
        })
    }
}

/// Accepts connections until `running` is cleared or accepting fails for
/// good. The listening socket is closed when this returns.
pub(crate) fn accept_loop<L, I, H>(mut listener: L, shared: Arc<Shared<I, H>>, running: Arc<AtomicBool>)
where
    L: Acceptor,
    I: ?Sized + RemoteInterface,
    H: SkeletonHooks,
{
    loop {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                // The wake-up connection from `stop`, or a client that lost the race.
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                tracing::debug!("Connection established from {}", peer_addr);

                let worker_shared = Arc::clone(&shared);
                let spawned = thread::Builder::new()
                    .name(format!("rmi-worker-{}", peer_addr))
                    .spawn(move || worker::handle_connection(stream, peer_addr, &worker_shared));
                if let Err(e) = spawned {
                    shared.hooks.on_service_error(&RmiError::Spawn(e.to_string()));
                }
            }
            Err(e) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let err = RmiError::Connection(format!("Failed to accept connection: {}", e));
                if shared.hooks.on_listen_error(&err) {
                    continue;
                }

                // Whoever clears the flag reports the stop; `stop` may have won.
                if running.swap(false, Ordering::SeqCst) {
                    drop(listener);
                    tracing::error!("{} accept loop ended: {}", shared.interface, err);
                    shared.hooks.on_stopped(Some(&err));
                }
                return;
            }
        }
    }

    tracing::debug!("{} accept loop finished", shared.interface);
}
