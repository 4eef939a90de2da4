//! Device scanners used by the polling bridge

use std::sync::Arc;

use futures::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::bindings::{InputFeed, InputSnapshot};
use crate::Result;

/// Blocks until a control is actuated or the scan is cancelled.
///
/// Implementations must return promptly once `cancel` fires. The returned
/// identifier is opaque to the polling bridge; `None` means the scan ended
/// without detecting anything and is reported as a cancellation.
#[async_trait::async_trait]
pub trait DeviceScanner: Send + Sync + 'static {
    async fn scan(&self, label: &str, cancel: &CancellationToken) -> Result<Option<String>>;
}

/// Scanner fed by the state the host writes on every input update.
///
/// The first snapshot seen is the baseline. The scan completes with the first
/// control whose byte rises from zero, identified as `"<device>/<control>"`.
#[derive(Debug, Clone)]
pub struct InputFeedScanner {
    feed: InputFeed,
}

impl InputFeedScanner {
    pub fn new(feed: InputFeed) -> Self {
        Self { feed }
    }
}

#[async_trait::async_trait]
impl DeviceScanner for InputFeedScanner {
    async fn scan(&self, label: &str, cancel: &CancellationToken) -> Result<Option<String>> {
        let rx = self.feed.subscribe();
        let mut baseline: Option<InputSnapshot> = None;
        // Yields the current value first, then every change.
        let mut updates = WatchStream::new(rx);

        debug!(label, "Scanning for input");
        loop {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(label, "Input scan cancelled");
                    return Ok(None);
                }
                next = updates.next() => match next {
                    Some(snapshot) => snapshot,
                    None => return Ok(None),
                },
            };

            let same_devices = baseline
                .as_ref()
                .is_some_and(|base| Arc::ptr_eq(&base.devices, &snapshot.devices));
            if !same_devices {
                // First snapshot, or the device set changed underneath us.
                baseline = Some(snapshot);
                continue;
            }
            let Some(base) = baseline.as_mut() else {
                continue;
            };

            if let Some(control) = first_rising(&base.state, &snapshot.state) {
                if let Some((device, name)) = snapshot.devices.control_at(control) {
                    let id = format!("{device}/{name}");
                    debug!(label, control = %id, "Input detected");
                    return Ok(Some(id));
                }
            }
            // Controls held at the start must be released before they count.
            release_controls(&mut base.state, &snapshot.state);
            trace!(label, sequence = snapshot.sequence, "No new input");
        }
    }
}

fn first_rising(before: &[u8], after: &[u8]) -> Option<usize> {
    before.iter().zip(after).position(|(&b, &a)| b == 0 && a != 0)
}

fn release_controls(baseline: &mut [u8], current: &[u8]) {
    for (b, &c) in baseline.iter_mut().zip(current) {
        if c == 0 {
            *b = 0;
        }
    }
}
