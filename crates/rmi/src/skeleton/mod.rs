//! Server side of a remote interface.
//!
//! A [`Skeleton`] owns an implementation object and serves it over TCP.
//! One thread accepts connections and hands each to its own worker thread,
//! which decodes a single request, dispatches it and writes the response.
//!
//! ```text
//! start()  -> bind, spawn accept loop
//!               accept -> worker: read request -> registry -> target -> write response
//! stop()   -> clear run flag, wake accept, join, on_stopped(None)
//! ```

mod hooks;
mod listener;
mod worker;


pub use hooks::{DefaultHooks, SkeletonHooks};

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use listener::{Acceptor, Waker};

use crate::interface::{check_remote_interface, OperationRegistry, RemoteInterface};
use crate::protocol::{ConfigError, Result, RmiError};
use crate::transport::MAX_MESSAGE_SIZE;

/// Skeleton settings.
///
/// # Example
///
/// ```
/// use rmi::SkeletonConfig;
///
/// let config = SkeletonConfig::new()
///     .with_address("127.0.0.1:7000".parse().unwrap())
///     .with_max_message_size(1024 * 1024);
/// assert_eq!(config.address.unwrap().port(), 7000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonConfig {
    /// Address to listen on. `None`, or port 0, lets the system pick a
    /// port on first start; that port is reused on later starts.
    pub address: Option<SocketAddr>,
    /// Largest request frame accepted from a client.
    pub max_message_size: usize,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            address: None,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl SkeletonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}

/// State shared by the accept loop and the workers.
pub(crate) struct Shared<I: ?Sized, H> {
    pub(crate) interface: String,
    pub(crate) target: Arc<I>,
    pub(crate) registry: OperationRegistry<I>,
    pub(crate) hooks: H,
    pub(crate) max_message_size: usize,
}

/// A running accept loop.
struct ListenerHandle {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    wake: Waker,
    thread: JoinHandle<()>,
}

struct State {
    configured: Option<SocketAddr>,
    bound: Option<SocketAddr>,
    listener: Option<ListenerHandle>,
}

/// Multithreaded TCP server for one implementation object.
///
/// A skeleton can be started and stopped any number of times. Dropping a
/// running skeleton stops it.
///
/// # Example
///
/// ```no_run
/// use rmi::{remote_interface, RmiError, Skeleton, SkeletonConfig, DefaultHooks};
/// use std::sync::Arc;
///
/// remote_interface! {
///     pub trait Clock {
///         fn now(&self) -> Result<u64, RmiError>;
///     }
/// }
///
/// struct Wall;
///
/// impl Clock for Wall {
///     fn now(&self) -> Result<u64, RmiError> {
///         Ok(0)
///     }
/// }
///
/// let config = SkeletonConfig::new().with_address("0.0.0.0:7100".parse().unwrap());
/// let skeleton = Skeleton::<dyn Clock, _>::with_hooks(Arc::new(Wall), config, DefaultHooks).unwrap();
/// skeleton.start().unwrap();
/// ```
pub struct Skeleton<I: ?Sized + RemoteInterface, H: SkeletonHooks = DefaultHooks> {
    shared: Arc<Shared<I, H>>,
    state: Mutex<State>,
}

impl<I: ?Sized + RemoteInterface> Skeleton<I> {
    /// Creates a skeleton on a system-assigned address.
    pub fn new(target: Arc<I>) -> std::result::Result<Self, ConfigError> {
        Self::with_hooks(target, SkeletonConfig::default(), DefaultHooks)
    }

    /// Creates a skeleton that will listen on `address`.
    pub fn bind(target: Arc<I>, address: SocketAddr) -> std::result::Result<Self, ConfigError> {
        Self::with_hooks(target, SkeletonConfig::new().with_address(address), DefaultHooks)
    }
}

impl<I: ?Sized + RemoteInterface, H: SkeletonHooks> Skeleton<I, H> {
    /// Creates a skeleton with custom settings and hooks.
    ///
    /// Only validates the interface and builds the dispatch table; no
    /// socket is opened until [`start`](Self::start).
    pub fn with_hooks(
        target: Arc<I>,
        config: SkeletonConfig,
        hooks: H,
    ) -> std::result::Result<Self, ConfigError> {
        let descriptor = I::descriptor();
        check_remote_interface(&descriptor)?;
        let registry = OperationRegistry::for_interface(&descriptor);

        Ok(Self {
            shared: Arc::new(Shared {
                interface: descriptor.name,
                target,
                registry,
                hooks,
                max_message_size: config.max_message_size,
            }),
            state: Mutex::new(State {
                configured: config.address,
                bound: None,
                listener: None,
            }),
        })
    }

    /// Binds the listening socket and starts the accept loop.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if the accept loop is alive
    /// - `Bind` if the address cannot be bound
    /// - `Spawn` if the accept thread cannot be created
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock_state();
        Self::ensure_idle(&mut state)?;

        let bind_addr = match (state.configured, state.bound) {
            (Some(addr), _) if addr.port() != 0 => addr,
            (_, Some(addr)) => addr,
            (Some(addr), None) => addr,
            (None, None) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        };

        let socket = TcpListener::bind(bind_addr).map_err(|e| RmiError::Bind {
            address: bind_addr.to_string(),
            reason: e.to_string(),
        })?;
        let local_addr = socket.local_addr()?;

        self.spawn_loop(&mut state, socket, local_addr)
    }

    /// Starts the accept loop over an arbitrary connection source.
    #[cfg(test)]
    pub(crate) fn start_on<L: Acceptor>(&self, source: L, local_addr: SocketAddr) -> Result<()> {
        let mut state = self.lock_state();
        Self::ensure_idle(&mut state)?;
        self.spawn_loop(&mut state, source, local_addr)
    }

    fn ensure_idle(state: &mut State) -> Result<()> {
        if let Some(handle) = &state.listener {
            if handle.running.load(Ordering::SeqCst) {
                return Err(RmiError::AlreadyRunning(handle.local_addr.to_string()));
            }
        }
        // A loop that ended on a listen error has already reported itself.
        if let Some(stale) = state.listener.take() {
            let _ = stale.thread.join();
        }
        Ok(())
    }

    fn spawn_loop<L: Acceptor>(&self, state: &mut State, source: L, local_addr: SocketAddr) -> Result<()> {
        let wake = source.waker(local_addr);
        let running = Arc::new(AtomicBool::new(true));
        let thread = {
            let shared = Arc::clone(&self.shared);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name(format!("rmi-accept-{}", local_addr.port()))
                .spawn(move || listener::accept_loop(source, shared, running))
                .map_err(|e| RmiError::Spawn(e.to_string()))?
        };

        state.bound = Some(local_addr);
        state.listener = Some(ListenerHandle {
            local_addr,
            running,
            wake,
            thread,
        });

        tracing::info!("{} skeleton listening on {}", self.shared.interface, local_addr);
        Ok(())
    }

    /// Stops the accept loop and waits for it to exit. No-op if not running.
    ///
    /// Connections already accepted are served to completion by their
    /// workers. If the accept loop cannot be woken, its thread is detached
    /// and exits on the next connection it accepts.
    pub fn stop(&self) {
        let mut state = self.lock_state();

        let Some(handle) = state.listener.take() else {
            return;
        };
        if !handle.running.swap(false, Ordering::SeqCst) {
            let _ = handle.thread.join();
            return;
        }

        if (handle.wake)() {
            if handle.thread.join().is_err() {
                tracing::error!("{} accept loop panicked", self.shared.interface);
            }
        } else {
            tracing::error!(
                "{} accept loop on {} could not be woken, detaching it",
                self.shared.interface,
                handle.local_addr
            );
        }

        tracing::info!("{} skeleton on {} stopped", self.shared.interface, handle.local_addr);
        self.shared.hooks.on_stopped(None);
    }

    /// The address stubs should connect to, if one is known yet.
    ///
    /// This is the bound address once the skeleton has been started, or
    /// the configured one if it names a port.
    pub fn address(&self) -> Option<SocketAddr> {
        let state = self.lock_state();
        state
            .bound
            .or_else(|| state.configured.filter(|addr| addr.port() != 0))
    }

    pub fn is_running(&self) -> bool {
        self.lock_state()
            .listener
            .as_ref()
            .is_some_and(|handle| handle.running.load(Ordering::SeqCst))
    }

    pub fn hooks(&self) -> &H {
        &self.shared.hooks
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I: ?Sized + RemoteInterface, H: SkeletonHooks> Drop for Skeleton<I, H> {
    fn drop(&mut self) {
        self.stop();
    }
}
