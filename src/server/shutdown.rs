use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll interval while waiting for in-flight requests to drain.
const DRAIN_POLL: Duration = Duration::from_millis(1);

/// Shared stop flag and in-flight request counter.
///
/// The dispatcher raises the flag on `/quit`; the accept loop and every
/// connection check it between requests.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    woken: AtomicBool,
    in_flight: AtomicUsize,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the stop flag. Returns `true` for the first caller only.
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Claim the job of waking the accept loop after a stop request.
    ///
    /// Only one caller per stop request gets `true`.
    pub(crate) fn claim_wake(&self) -> bool {
        self.is_requested() && !self.woken.swap(true, Ordering::SeqCst)
    }

    /// Number of requests currently between head parse and response write.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Mark a request as in flight until the returned guard drops.
    pub fn begin_request(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            signal: Arc::clone(self),
        }
    }

    /// Block until no request is in flight or `timeout` passes.
    ///
    /// Returns `true` when the server drained cleanly.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            may::coroutine::sleep(DRAIN_POLL);
        }
        true
    }
}

/// RAII marker for one in-flight request.
#[derive(Debug)]
pub struct InFlightGuard {
    signal: Arc<ShutdownSignal>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.signal.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
