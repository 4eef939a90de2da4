//! Input handling
//!
//! Two independent pieces share the per-frame input state the host writes:
//!
//! - [`InputRouter`] turns rising edges on bound controls into [`InputAction`]s
//!   for the frame bridge.
//! - [`InputPollingBridge`] runs at most one cancellable scan at a time to
//!   find out which control the user wants to bind. [`InputFeedScanner`]
//!   watches the same state through an [`InputFeed`].

mod bindings;
mod polling;
mod scanner;

pub use bindings::{InputAction, InputFeed, InputRouter, InputSnapshot};
pub use polling::{InputPollingBridge, PollOutcome};
pub use scanner::{DeviceScanner, InputFeedScanner};
