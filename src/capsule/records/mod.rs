//! Concrete record layouts

mod graphics;
mod input_devices;
mod scoring;
mod telemetry;

pub use graphics::{GraphicsInfo, GraphicsInfoCapsule};
pub use input_devices::{CONTROL_NAME_LEN, DEVICE_NAME_LEN, InputDevice, InputDeviceInfo};
pub use scoring::{MAX_VEHICLES, ScoringInfo, ScoringInfoCapsule, VehicleScoring, VehicleScoringCapsule};
pub use telemetry::{TelemetryData, TelemetryDataCapsule};
