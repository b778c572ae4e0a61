//! Cancellation handle shared by every tracker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hearth_bus::Subscription;

/// Handle returned by every `track_*` function
///
/// Invoking [`cancel`](Self::cancel) guarantees no further firings of
/// the tracker's callback. It is idempotent and safe to call from
/// inside the tracker's own callback or from any thread. Cancellation
/// never "joins" an in-flight callback: it only prevents future ones.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    cancelled: AtomicBool,
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl CancelHandle {
    /// Wrap a teardown function
    pub fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                cancel: Box::new(cancel),
            }),
        }
    }

    /// Handle for a registration with nothing to tear down
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Handle that cancels a single bus subscription
    pub fn from_subscription(subscription: Subscription) -> Self {
        Self::new(move || subscription.cancel())
    }

    /// Tear the tracker down; a no-op after the first call
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.inner.cancel)();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.inner.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}
