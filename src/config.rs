//! Bridge configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document (or no
//! file at all) yields a working configuration:
//!
//! ```yaml
//! byte_order: probe
//! dirty:
//!   block_size: 16
//!   merge_overhead: 2.0
//!   max_rects: 32
//! clock:
//!   coarse_interval_frames: 10
//!   fine_interval_frames: 2
//! bindings:
//!   - device: Keyboard
//!     control: F7
//!     action:
//!       kind: toggle_plugin_enabled
//!   - device: Wheel
//!     control: Button 3
//!     modifiers: 1
//!     action:
//!       kind: toggle_widget_visible
//!       widget: standings
//! log_filter: hudbridge=debug
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capsule::ByteOrder;
use crate::input::InputAction;
use crate::{BridgeError, Result};

/// Top-level configuration for one bridge instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub byte_order: ByteOrderSetting,
    pub dirty: DirtyRectConfig,
    pub clock: ClockConfig,
    pub bindings: Vec<BindingConfig>,
    pub log_filter: Option<String>,
}

impl BridgeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        debug!(bindings = config.bindings.len(), "Configuration parsed");
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::io(format!("reading configuration {}", path.display()), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.dirty.validate()?;
        self.clock.validate()?;
        for binding in &self.bindings {
            binding.validate()?;
        }
        Ok(())
    }
}

/// How the bridge decides the byte order of host buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrderSetting {
    #[default]
    Native,
    LittleEndian,
    BigEndian,
    /// Derive from the probe marker supplied by the host.
    Probe,
}

impl ByteOrderSetting {
    /// Resolve to a concrete byte order. `probe` is required for [`ByteOrderSetting::Probe`].
    pub fn resolve(self, probe: Option<[u8; 4]>) -> Result<ByteOrder> {
        match self {
            ByteOrderSetting::Native => Ok(ByteOrder::native()),
            ByteOrderSetting::LittleEndian => Ok(ByteOrder::LITTLE_ENDIAN),
            ByteOrderSetting::BigEndian => Ok(ByteOrder::BIG_ENDIAN),
            ByteOrderSetting::Probe => match probe {
                Some(marker) => ByteOrder::from_probe(marker),
                None => Err(BridgeError::config("byte_order is 'probe' but the host supplied no probe")),
            },
        }
    }
}

/// Dirty-rectangle tracking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirtyRectConfig {
    /// Edge length in pixels of the square blocks compared between frames.
    pub block_size: u32,
    /// Two rectangles merge when their union area is at most this factor
    /// times the sum of their areas.
    pub merge_overhead: f32,
    /// Export capacity per surface. More rectangles collapse to one full-surface rect.
    pub max_rects: usize,
    /// Changed blocks beyond this count skip merging and collapse immediately.
    pub max_candidate_rects: usize,
}

impl Default for DirtyRectConfig {
    fn default() -> Self {
        Self { block_size: 16, merge_overhead: 2.0, max_rects: 32, max_candidate_rects: 1024 }
    }
}

impl DirtyRectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BridgeError::config("dirty.block_size must be at least 1"));
        }
        if !(self.merge_overhead.is_finite() && self.merge_overhead >= 1.0) {
            return Err(BridgeError::config(format!(
                "dirty.merge_overhead must be a finite value >= 1.0, got {}",
                self.merge_overhead
            )));
        }
        if self.max_rects == 0 {
            return Err(BridgeError::config("dirty.max_rects must be at least 1"));
        }
        if self.max_candidate_rects < self.max_rects {
            return Err(BridgeError::config(format!(
                "dirty.max_candidate_rects ({}) must not be below dirty.max_rects ({})",
                self.max_candidate_rects, self.max_rects
            )));
        }
        Ok(())
    }
}

/// Cadences of the coarse and fine clock signals handed to widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub coarse_interval_frames: u32,
    pub fine_interval_frames: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { coarse_interval_frames: 10, fine_interval_frames: 2 }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<()> {
        if self.coarse_interval_frames == 0 || self.fine_interval_frames == 0 {
            return Err(BridgeError::config("clock intervals must be at least one frame"));
        }
        Ok(())
    }
}

/// One input binding: a control on a device, with modifiers held, triggers an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    pub device: String,
    pub control: String,
    #[serde(default)]
    pub modifiers: u32,
    pub action: InputAction,
}

impl BindingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() || self.control.is_empty() {
            return Err(BridgeError::config("bindings need both a device and a control"));
        }
        if let InputAction::ToggleWidgetVisible { widget } = &self.action {
            if widget.is_empty() {
                return Err(BridgeError::config(format!(
                    "binding {}/{} toggles a widget without naming it",
                    self.device, self.control
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = BridgeConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.dirty.merge_overhead, 2.0);
        assert_eq!(config.dirty.max_rects, 32);
        assert_eq!(config.dirty.block_size, 16);
        assert_eq!(config.clock, ClockConfig { coarse_interval_frames: 10, fine_interval_frames: 2 });
    }

    #[test]
    fn full_document_parses() {
        let yaml = r#"
byte_order: big_endian
dirty:
  block_size: 8
  max_rects: 4
clock:
  fine_interval_frames: 1
bindings:
  - device: Keyboard
    control: F7
    action:
      kind: toggle_plugin_enabled
  - device: Wheel
    control: Button 3
    modifiers: 1
    action:
      kind: toggle_widget_visible
      widget: standings
  - device: Wheel
    control: Button 4
    action:
      kind: force_complete_redraw
log_filter: hudbridge=trace
"#;
        let config = BridgeConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.byte_order, ByteOrderSetting::BigEndian);
        assert_eq!(config.dirty.block_size, 8);
        assert_eq!(config.dirty.max_rects, 4);
        assert_eq!(config.dirty.merge_overhead, 2.0);
        assert_eq!(config.clock.coarse_interval_frames, 10);
        assert_eq!(config.clock.fine_interval_frames, 1);
        assert_eq!(config.bindings.len(), 3);
        assert_eq!(config.bindings[1].modifiers, 1);
        assert_eq!(
            config.bindings[1].action,
            InputAction::ToggleWidgetVisible { widget: "standings".to_string() }
        );
        assert_eq!(config.bindings[2].action, InputAction::ForceCompleteRedraw);
        assert_eq!(config.log_filter.as_deref(), Some("hudbridge=trace"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for yaml in [
            "dirty: { block_size: 0 }",
            "dirty: { merge_overhead: 0.5 }",
            "dirty: { max_rects: 0 }",
            "dirty: { max_rects: 64, max_candidate_rects: 10 }",
            "clock: { coarse_interval_frames: 0 }",
        ] {
            let err = BridgeConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, BridgeError::Config { .. }), "{yaml} gave {err:?}");
        }
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = BridgeConfig::from_yaml_str("dirty: [1, 2").unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));
    }

    #[test]
    fn byte_order_setting_resolves() {
        assert_eq!(ByteOrderSetting::BigEndian.resolve(None).unwrap(), ByteOrder::BIG_ENDIAN);
        assert_eq!(ByteOrderSetting::Native.resolve(None).unwrap(), ByteOrder::native());
        assert_eq!(
            ByteOrderSetting::Probe.resolve(Some([3, 2, 1, 0])).unwrap(),
            ByteOrder::BIG_ENDIAN
        );
        assert!(ByteOrderSetting::Probe.resolve(None).is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_bindings() {
        let mut config = BridgeConfig::default();
        config.bindings.push(BindingConfig {
            device: "Keyboard".into(),
            control: "F9".into(),
            modifiers: 0,
            action: InputAction::ToggleWidgetVisible { widget: "rev_lights".into() },
        });
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(BridgeConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
