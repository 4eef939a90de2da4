//! Single-flight, cancellable input polling
//!
//! Binding a control to an action starts a *polling session*: a scan on a
//! dedicated thread that waits for the user to press something. At most one
//! session exists at a time. The caller gets control back immediately and
//! learns the outcome through a completion callback.
//!
//! ## Guarantees
//!
//! - [`InputPollingBridge::start_polling`] while a session is active does
//!   nothing and returns `false`.
//! - [`InputPollingBridge::interrupt`] may be called from any thread. It wakes
//!   the scan through its [`CancellationToken`] instead of waiting for a timeout.
//! - The completion callback runs exactly once per session, on the polling
//!   thread, after [`InputPollingBridge::is_polling`] has turned `false`. A
//!   new session may be started from inside the callback.
//!
//! ## Usage Example
//!
//! ```rust
//! use hudbridge::input::{InputFeed, InputFeedScanner, InputPollingBridge, PollOutcome};
//! use std::sync::mpsc;
//!
//! let bridge = InputPollingBridge::new(InputFeedScanner::new(InputFeed::new()));
//! let (tx, rx) = mpsc::channel();
//!
//! assert!(bridge.start_polling("Toggle standings", move |outcome| {
//!     let _ = tx.send(outcome);
//! }));
//! bridge.interrupt();
//!
//! assert_eq!(rx.recv().unwrap(), PollOutcome::Cancelled);
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::scanner::DeviceScanner;

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A control was actuated.
    Detected(String),
    /// Interrupted, or the scan ended without detecting anything.
    Cancelled,
}

impl PollOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollOutcome::Cancelled)
    }

    /// Identifier of the detected control.
    pub fn control_id(&self) -> Option<&str> {
        match self {
            PollOutcome::Detected(id) => Some(id),
            PollOutcome::Cancelled => None,
        }
    }
}

#[derive(Debug)]
enum PollSlot {
    Idle,
    Active { session: u64, label: String, cancel: CancellationToken },
}

/// Runs at most one device scan at a time on a background thread.
pub struct InputPollingBridge<S: DeviceScanner> {
    scanner: Arc<S>,
    slot: Arc<Mutex<PollSlot>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    sessions: AtomicU64,
}

impl<S: DeviceScanner> InputPollingBridge<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner: Arc::new(scanner),
            slot: Arc::new(Mutex::new(PollSlot::Idle)),
            worker: Mutex::new(None),
            sessions: AtomicU64::new(0),
        }
    }

    /// Start a scan labelled `label`.
    ///
    /// Returns `false` without touching the active session if one is running.
    pub fn start_polling<F>(&self, label: &str, on_complete: F) -> bool
    where
        F: FnOnce(PollOutcome) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let session = {
            let mut slot = self.slot.lock();
            if let PollSlot::Active { label: active, .. } = &*slot {
                debug!(requested = label, active = %active, "Polling already active, ignoring start");
                return false;
            }
            let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
            *slot = PollSlot::Active { session, label: label.to_string(), cancel: cancel.clone() };
            session
        };

        let scanner = Arc::clone(&self.scanner);
        let slot = Arc::clone(&self.slot);
        let owned_label = label.to_string();

        let spawned = thread::Builder::new()
            .name(format!("hudbridge-poll-{session}"))
            .spawn(move || {
                let outcome = run_scan(scanner.as_ref(), &owned_label, &cancel);
                {
                    let mut slot = slot.lock();
                    if matches!(&*slot, PollSlot::Active { session: s, .. } if *s == session) {
                        *slot = PollSlot::Idle;
                    }
                }
                info!(label = %owned_label, session, cancelled = outcome.is_cancelled(), "Polling session finished");
                on_complete(outcome);
            });

        match spawned {
            Ok(handle) => {
                // A previous worker has already released the slot; it finishes on its own.
                *self.worker.lock() = Some(handle);
                debug!(label, session, "Polling session started");
                true
            }
            Err(e) => {
                error!(label, error = %e, "Failed to spawn polling thread");
                *self.slot.lock() = PollSlot::Idle;
                false
            }
        }
    }

    /// Cancel the active session, if any. Safe from any thread.
    pub fn interrupt(&self) {
        if let PollSlot::Active { label, cancel, .. } = &*self.slot.lock() {
            debug!(label = %label, "Interrupting polling session");
            cancel.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(&*self.slot.lock(), PollSlot::Active { .. })
    }

    /// Label of the active session.
    pub fn active_label(&self) -> Option<String> {
        match &*self.slot.lock() {
            PollSlot::Active { label, .. } => Some(label.clone()),
            PollSlot::Idle => None,
        }
    }
}

impl<S: DeviceScanner> Drop for InputPollingBridge<S> {
    fn drop(&mut self) {
        self.interrupt();
        if let Some(handle) = self.worker.get_mut().take() {
            // Dropping the bridge from inside the completion callback must not self-join.
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Polling thread panicked during shutdown");
            }
        }
    }
}

/// Drive one scan to completion on the current thread.
fn run_scan<S: DeviceScanner + ?Sized>(scanner: &S, label: &str, cancel: &CancellationToken) -> PollOutcome {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(label, error = %e, "Failed to build polling runtime");
            return PollOutcome::Cancelled;
        }
    };

    let scan = AssertUnwindSafe(scanner.scan(label, cancel)).catch_unwind();
    let result = runtime.block_on(scan);

    match result {
        Ok(Ok(Some(control))) if !cancel.is_cancelled() => PollOutcome::Detected(control),
        Ok(Ok(_)) => PollOutcome::Cancelled,
        Ok(Err(e)) => {
            warn!(label, error = %e, "Input scan failed");
            PollOutcome::Cancelled
        }
        Err(_) => {
            error!(label, "Input scan panicked");
            PollOutcome::Cancelled
        }
    }
}
