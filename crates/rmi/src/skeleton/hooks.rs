use std::sync::Arc;

use crate::protocol::RmiError;

/// Callbacks a [`Skeleton`](super::Skeleton) invokes on lifecycle events and
/// failures it cannot report to a caller.
///
/// Hooks run on the skeleton's own threads: the accept loop for
/// `on_listen_error`, worker threads for `on_service_error`, and whichever
/// thread ends the accept loop for `on_stopped`.
///
/// After [`stop`](super::Skeleton::stop), `on_stopped(None)` runs on the
/// caller's thread with the lifecycle lock held. After a listen error,
/// `on_stopped(Some(..))` runs on the accept thread without the lock, and
/// the accept loop is only joined by the next `start` or `stop`. In both
/// cases the hook must not call `start` or `stop` on the same skeleton.
pub trait SkeletonHooks: Send + Sync + 'static {
    /// Called when accepting a connection fails. Returning `true` resumes
    /// accepting; `false` shuts the listener down.
    fn on_listen_error(&self, error: &RmiError) -> bool {
        tracing::error!("Listener failed: {}", error);
        false
    }

    /// Called when a connection could not be served.
    fn on_service_error(&self, error: &RmiError) {
        tracing::warn!("Service error: {}", error);
    }

    /// Called once per run of the accept loop, when it ends. `cause` is
    /// `None` after an orderly [`stop`](super::Skeleton::stop).
    fn on_stopped(&self, cause: Option<&RmiError>) {
        match cause {
            None => tracing::info!("Skeleton stopped"),
            Some(err) => tracing::error!("Skeleton stopped: {}", err),
        }
    }
}

/// Logs every event and gives up on the first listen error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl SkeletonHooks for DefaultHooks {}

impl<H: SkeletonHooks + ?Sized> SkeletonHooks for Arc<H> {
    fn on_listen_error(&self, error: &RmiError) -> bool {
        (**self).on_listen_error(error)
    }

    fn on_service_error(&self, error: &RmiError) {
        (**self).on_service_error(error)
    }

    fn on_stopped(&self, cause: Option<&RmiError>) {
        (**self).on_stopped(cause)
    }
}
