//! Error types for the overlay bridge.
//!
//! Every fallible operation in the crate returns [`BridgeError`]. The host-facing
//! entry points on [`crate::FrameBridge`] never surface these errors directly: they
//! are logged and folded into a status code, so a failure shows up as "nothing
//! rendered this frame" rather than a crash inside the simulator.
//!
//! ## Error Categories
//!
//! - **Capsule Errors**: truncated reads, out-of-layout field access, byte order setup
//! - **Render Errors**: a widget failed while drawing a frame
//! - **Reconfiguration Errors**: the widget set or surfaces could not be rebuilt
//! - **Configuration Errors**: YAML configuration could not be parsed or validated
//! - **Input Errors**: malformed device descriptors from the host
//!
//! ## Recovery
//!
//! ```rust
//! use hudbridge::BridgeError;
//!
//! let error = BridgeError::truncated_capsule("TelemetryData", 512, 100);
//! assert!(error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Truncated {record} capsule: expected {expected} bytes, received {received}")]
    TruncatedCapsule { record: String, expected: usize, received: usize },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Byte order {order:?} is not a permutation of [0, 1, 2, 3]")]
    InvalidByteOrder { order: [u8; 4] },

    #[error("Field access outside {record} layout at offset {offset} (length {len})")]
    Layout { record: String, offset: usize, len: usize },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("Widget '{widget}' failed to render: {reason}")]
    Render { widget: String, reason: String },

    #[error("Reconfiguration failed: {reason}")]
    Reconfiguration {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Invalid input device descriptor: {details}")]
    InputDescriptor { details: String },

    #[error("Invalid recording: {details}")]
    Recording { details: String },

    #[error("An input polling session is already active")]
    PollingAlreadyActive,
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::TruncatedCapsule { .. } => true,
            BridgeError::Io { .. } => true,
            BridgeError::Render { .. } => true,
            BridgeError::Reconfiguration { .. } => true,
            BridgeError::PollingAlreadyActive => true,
            BridgeError::InvalidByteOrder { .. } => false,
            BridgeError::Layout { .. } => false,
            BridgeError::TypeConversion { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::InputDescriptor { .. } => false,
            BridgeError::Recording { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::TruncatedCapsule { .. } => vec![
                "Check that the host and overlay share the same protocol version",
                "Verify the host writes complete records every frame",
                "Retry the read on the next frame",
            ],
            BridgeError::Io { .. } => vec![
                "Check the stream or file is still open",
                "Verify file permissions for recordings",
            ],
            BridgeError::InvalidByteOrder { .. } => vec![
                "Verify the host writes the byte order probe marker correctly",
                "Configure an explicit byte order instead of probing",
            ],
            BridgeError::Layout { .. } => vec![
                "Check field offsets against the record layout",
                "Verify vehicle counts reported by the host",
            ],
            BridgeError::TypeConversion { .. } => vec![
                "Check the field kind matches the value being encoded",
                "Verify expected vs actual field kinds in the record layout",
            ],
            BridgeError::Render { .. } => vec![
                "Check the widget configuration",
                "Inspect the log for the widget's failure reason",
                "The next frame retries rendering automatically",
            ],
            BridgeError::Reconfiguration { .. } => vec![
                "Check the widget configuration source",
                "Verify the host resolution is non-zero",
                "Toggle the plugin to retry",
            ],
            BridgeError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Verify configured values are within their valid ranges",
            ],
            BridgeError::InputDescriptor { .. } => vec![
                "Verify the host device descriptor format",
                "Reconnect input devices and restart the session",
            ],
            BridgeError::Recording { .. } => vec![
                "Check the file was written by a compatible recorder",
                "Re-record the session",
            ],
            BridgeError::PollingAlreadyActive => vec![
                "Wait for the active polling session to complete",
                "Interrupt the active session before starting a new one",
            ],
        }
    }

    /// Helper constructor for truncated capsule reads.
    pub fn truncated_capsule(record: impl Into<String>, expected: usize, received: usize) -> Self {
        BridgeError::TruncatedCapsule { record: record.into(), expected, received }
    }

    /// Helper constructor for I/O errors with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Io { context: context.into(), source }
    }

    /// Helper constructor for out-of-layout field access.
    pub fn layout(record: impl Into<String>, offset: usize, len: usize) -> Self {
        BridgeError::Layout { record: record.into(), offset, len }
    }

    /// Helper constructor for widget render failures.
    pub fn render_failed(widget: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Render { widget: widget.into(), reason: reason.into() }
    }

    /// Helper constructor for reconfiguration failures.
    pub fn reconfiguration_failed(reason: impl Into<String>) -> Self {
        BridgeError::Reconfiguration { reason: reason.into(), source: None }
    }

    /// Helper constructor for reconfiguration failures with source.
    pub fn reconfiguration_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Reconfiguration { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        BridgeError::Config { details: details.into() }
    }

    /// Helper constructor for malformed input descriptors.
    pub fn input_descriptor(details: impl Into<String>) -> Self {
        BridgeError::InputDescriptor { details: details.into() }
    }

    /// Helper constructor for malformed recordings.
    pub fn recording(details: impl Into<String>) -> Self {
        BridgeError::Recording { details: details.into() }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                BridgeError::TruncatedCapsule { record: "<unknown>".to_string(), expected: 0, received: 0 }
            }
            _ => BridgeError::Io { context: "<unknown>".to_string(), source: err },
        }
    }
}

impl From<serde_yaml_ng::Error> for BridgeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BridgeError::Config { details: err.to_string() }
    }
}
