//! Input device descriptor handed over once by the host

use crate::capsule::ByteOrder;
use crate::capsule::codec::{SIZE_INT, read_i32, read_string};
use crate::{BridgeError, Result};

pub const DEVICE_NAME_LEN: usize = 64;
pub const CONTROL_NAME_LEN: usize = 32;

/// Sanity limits; anything above is treated as a corrupt descriptor.
const MAX_DEVICES: i32 = 64;
const MAX_CONTROLS_PER_DEVICE: i32 = 1024;

/// One physical input device and the names of its controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub name: String,
    pub controls: Vec<String>,
}

/// Every input device known to the host.
///
/// Unlike the fixed capsules this record is variable length: an `i32` device
/// count, then per device a 64-byte name, an `i32` control count and that many
/// 32-byte control names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDeviceInfo {
    devices: Vec<InputDevice>,
}

impl InputDeviceInfo {
    pub fn new(devices: Vec<InputDevice>) -> Self {
        Self { devices }
    }

    pub fn decode(bytes: &[u8], order: &ByteOrder) -> Result<Self> {
        let mut cursor = 0usize;

        let device_count = read_count(bytes, &mut cursor, order, "device count", MAX_DEVICES)?;
        let mut devices = Vec::with_capacity(device_count);

        for index in 0..device_count {
            let name = read_name(bytes, &mut cursor, DEVICE_NAME_LEN, "device name", index)?;
            let control_count =
                read_count(bytes, &mut cursor, order, "control count", MAX_CONTROLS_PER_DEVICE)?;

            let mut controls = Vec::with_capacity(control_count);
            for _ in 0..control_count {
                controls.push(read_name(bytes, &mut cursor, CONTROL_NAME_LEN, "control name", index)?);
            }
            devices.push(InputDevice { name, controls });
        }

        Ok(Self { devices })
    }

    /// Encode in the host's descriptor format.
    pub fn encode(&self, order: &ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&order.write_u32(self.devices.len() as u32));
        for device in &self.devices {
            push_name(&mut out, &device.name, DEVICE_NAME_LEN);
            out.extend_from_slice(&order.write_u32(device.controls.len() as u32));
            for control in &device.controls {
                push_name(&mut out, control, CONTROL_NAME_LEN);
            }
        }
        out
    }

    fn encoded_len(&self) -> usize {
        SIZE_INT
            + self
                .devices
                .iter()
                .map(|d| DEVICE_NAME_LEN + SIZE_INT + d.controls.len() * CONTROL_NAME_LEN)
                .sum::<usize>()
    }

    pub fn devices(&self) -> &[InputDevice] {
        &self.devices
    }

    /// Total number of controls across all devices.
    pub fn control_count(&self) -> usize {
        self.devices.iter().map(|d| d.controls.len()).sum()
    }

    /// Flat index of `control` on `device` into the per-control state buffer.
    pub fn control_index(&self, device: &str, control: &str) -> Option<usize> {
        let mut base = 0usize;
        for d in &self.devices {
            if d.name == device {
                return d.controls.iter().position(|c| c == control).map(|i| base + i);
            }
            base += d.controls.len();
        }
        None
    }

    /// `(device, control)` names for a flat control index.
    pub fn control_at(&self, mut index: usize) -> Option<(&str, &str)> {
        for d in &self.devices {
            if index < d.controls.len() {
                return Some((&d.name, &d.controls[index]));
            }
            index -= d.controls.len();
        }
        None
    }
}

fn read_count(
    bytes: &[u8],
    cursor: &mut usize,
    order: &ByteOrder,
    what: &str,
    limit: i32,
) -> Result<usize> {
    let value = read_i32(bytes, *cursor, order)
        .map_err(|_| BridgeError::input_descriptor(format!("{what} missing at offset {cursor}")))?;
    *cursor += SIZE_INT;

    if !(0..=limit).contains(&value) {
        return Err(BridgeError::input_descriptor(format!(
            "{what} {value} outside 0..={limit}"
        )));
    }
    Ok(value as usize)
}

fn read_name(
    bytes: &[u8],
    cursor: &mut usize,
    len: usize,
    what: &str,
    device: usize,
) -> Result<String> {
    let name = read_string(bytes, *cursor, len).map_err(|_| {
        BridgeError::input_descriptor(format!("{what} of device {device} truncated at offset {cursor}"))
    })?;
    *cursor += len;
    Ok(name)
}

fn push_name(out: &mut Vec<u8>, name: &str, len: usize) {
    let start = out.len();
    out.resize(start + len, 0);
    let copied = name.len().min(len - 1);
    out[start..start + copied].copy_from_slice(&name.as_bytes()[..copied]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel_and_pedals() -> InputDeviceInfo {
        InputDeviceInfo::new(vec![
            InputDevice {
                name: "Wheel".to_string(),
                controls: vec!["Button 1".into(), "Button 2".into(), "Paddle L".into()],
            },
            InputDevice { name: "Keyboard".to_string(), controls: vec!["F7".into(), "F8".into()] },
        ])
    }

    #[test]
    fn descriptor_decodes_devices_and_controls() {
        let order = ByteOrder::BIG_ENDIAN;
        let bytes = wheel_and_pedals().encode(&order);
        assert_eq!(bytes.len(), 4 + (64 + 4 + 3 * 32) + (64 + 4 + 2 * 32));

        let info = InputDeviceInfo::decode(&bytes, &order).unwrap();
        assert_eq!(info, wheel_and_pedals());
        assert_eq!(info.control_count(), 5);
        assert_eq!(info.control_index("Keyboard", "F8"), Some(4));
        assert_eq!(info.control_at(2), Some(("Wheel", "Paddle L")));
        assert_eq!(info.control_at(5), None);
    }

    #[test]
    fn truncated_descriptor_is_rejected() {
        let order = ByteOrder::LITTLE_ENDIAN;
        let bytes = wheel_and_pedals().encode(&order);
        let err = InputDeviceInfo::decode(&bytes[..bytes.len() - 1], &order).unwrap_err();
        assert!(matches!(err, BridgeError::InputDescriptor { .. }));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let order = ByteOrder::LITTLE_ENDIAN;
        let bytes = order.write_u32(-3i32 as u32);
        let err = InputDeviceInfo::decode(&bytes, &order).unwrap_err();
        assert!(matches!(err, BridgeError::InputDescriptor { ref details } if details.contains("-3")));
    }

    #[test]
    fn empty_descriptor_has_no_devices() {
        let order = ByteOrder::native();
        let info = InputDeviceInfo::decode(&order.write_u32(0), &order).unwrap();
        assert!(info.devices().is_empty());
        assert_eq!(info.control_count(), 0);
    }
}
