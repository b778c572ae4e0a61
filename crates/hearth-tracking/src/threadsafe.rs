//! Blocking registration adapter
//!
//! Every `track_*` function must be registered on the thread driving
//! the event loop. Callers running elsewhere submit the registration
//! through this one generic adapter instead of each tracker growing a
//! blocking twin.

use tokio::runtime::Handle;
use tracing::error;

use crate::cancel::CancelHandle;

/// Run a tracker registration on the event loop and block until it
/// completes
///
/// The returned handle round-trips cancellation back onto the loop the
/// same way. Must not be called from within the loop thread itself:
/// blocking there would deadlock the very loop that has to run the
/// registration.
pub fn register_blocking<F>(handle: &Handle, register: F) -> CancelHandle
where
    F: FnOnce() -> CancelHandle + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::sync_channel(1);
    handle.spawn(async move {
        let _ = tx.send(register());
    });

    match rx.recv() {
        Ok(inner) => {
            let handle = handle.clone();
            CancelHandle::new(move || {
                let inner = inner.clone();
                handle.spawn(async move { inner.cancel() });
            })
        }
        Err(_) => {
            error!("event loop went away before the registration completed");
            CancelHandle::noop()
        }
    }
}
