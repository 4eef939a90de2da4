//! In-process bridge between a racing simulator host and a HUD overlay renderer.
//!
//! The host shares telemetry with the overlay as fixed-size binary records and
//! calls into the bridge once per frame. The bridge lets widgets draw into
//! their own texture surfaces, works out which parts of each surface changed
//! and tells the host what to upload.
//!
//! # Features
//!
//! - **ByteCapsules**: fixed-layout records decoded in the host's byte order,
//!   whatever permutation of four bytes that is
//! - **Dirty rectangles**: block-level change detection with merging and a
//!   per-surface rectangle cap
//! - **Frame bridge**: enable/reload state machine answering each frame with a
//!   one-byte status code
//! - **Input polling**: single-flight, cancellable scans for binding controls
//! - **Recordings**: capture capsules to a file and replay them offline
//!
//! # Quick Start
//!
//! ```rust
//! use hudbridge::{BridgeConfig, FrameBridge, FrameInputs, Resolution, StatusCode, Widget};
//!
//! let config = BridgeConfig::from_yaml_str("dirty:\n  max_rects: 16\n").unwrap();
//! let mut bridge = FrameBridge::new(config, || -> hudbridge::Result<Vec<Box<dyn Widget>>> {
//!     Ok(Vec::new())
//! })
//! .unwrap();
//!
//! let frame = FrameInputs { plugin_enabled: true, resolution: Resolution::new(2560, 1440) };
//! match bridge.update(frame) {
//!     StatusCode::Quiescent => {}
//!     StatusCode::Render => { /* upload dirty rects */ }
//!     StatusCode::RenderAndPublishTextureInfo => { /* re-read texture info, then upload */ }
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Configuration and diagnostics
pub mod config;
pub mod logging;

// Shared memory records
pub mod capsule;
pub mod game_data;
pub mod recording;

// Rendering
pub mod bridge;
pub mod dirty;
pub mod surface;

// Input
pub mod input;

// Core exports
pub use error::*;

pub use bridge::{BridgeState, FrameBridge, FrameInputs, StatusCode, Widget, WidgetSource};
pub use capsule::ByteOrder;
pub use config::BridgeConfig;
pub use game_data::LiveGameData;
pub use surface::{DirtyRect, Resolution, TextureSurface};
