//! Fixed-offset field codec
//!
//! Decodes and encodes individual fields of a flat binary record. Multi-byte
//! numeric fields go through the injected [`ByteOrder`]; byte arrays (names,
//! flag sets) are copied verbatim.

use super::{ByteOrder, Vector3};
use crate::{BridgeError, Result};

pub const SIZE_BYTE: usize = 1;
pub const SIZE_BOOL: usize = 1;
pub const SIZE_INT: usize = 4;
pub const SIZE_FLOAT: usize = 4;
pub const SIZE_LONG: usize = 8;
pub const SIZE_DOUBLE: usize = 8;
pub const SIZE_VECTOR3: usize = 3 * SIZE_FLOAT;

/// Wire type of a single capsule field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Byte,
    Bool,
    Int32,
    UInt32,
    Float32,
    Int64,
    Float64,
    Vector3,
    /// Fixed-length byte array, never permuted
    Bytes(usize),
}

impl FieldKind {
    /// Size in bytes of this field on the wire.
    pub const fn size(&self) -> usize {
        match self {
            FieldKind::Byte => SIZE_BYTE,
            FieldKind::Bool => SIZE_BOOL,
            FieldKind::Int32 | FieldKind::UInt32 => SIZE_INT,
            FieldKind::Float32 => SIZE_FLOAT,
            FieldKind::Int64 => SIZE_LONG,
            FieldKind::Float64 => SIZE_DOUBLE,
            FieldKind::Vector3 => SIZE_VECTOR3,
            FieldKind::Bytes(len) => *len,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Byte(u8),
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Int64(i64),
    Float64(f64),
    Vector3(Vector3),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// The wire kind this value encodes as.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Byte(_) => FieldKind::Byte,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Int32(_) => FieldKind::Int32,
            FieldValue::UInt32(_) => FieldKind::UInt32,
            FieldValue::Float32(_) => FieldKind::Float32,
            FieldValue::Int64(_) => FieldKind::Int64,
            FieldValue::Float64(_) => FieldKind::Float64,
            FieldValue::Vector3(_) => FieldKind::Vector3,
            FieldValue::Bytes(bytes) => FieldKind::Bytes(bytes.len()),
        }
    }
}

/// Named field at a fixed offset inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    /// First byte past the end of the field.
    pub const fn end(&self) -> usize {
        self.offset + self.kind.size()
    }
}

/// Decode the field of `kind` starting at `offset`.
pub fn decode_field(
    buffer: &[u8],
    offset: usize,
    kind: FieldKind,
    order: &ByteOrder,
) -> Result<FieldValue> {
    let value = match kind {
        FieldKind::Byte => FieldValue::Byte(read_u8(buffer, offset)?),
        FieldKind::Bool => FieldValue::Bool(read_u8(buffer, offset)? != 0),
        FieldKind::Int32 => FieldValue::Int32(read_i32(buffer, offset, order)?),
        FieldKind::UInt32 => FieldValue::UInt32(read_u32(buffer, offset, order)?),
        FieldKind::Float32 => FieldValue::Float32(read_f32(buffer, offset, order)?),
        FieldKind::Int64 => FieldValue::Int64(read_i64(buffer, offset, order)?),
        FieldKind::Float64 => FieldValue::Float64(read_f64(buffer, offset, order)?),
        FieldKind::Vector3 => FieldValue::Vector3(read_vector3(buffer, offset, order)?),
        FieldKind::Bytes(len) => FieldValue::Bytes(field_slice(buffer, offset, len)?.to_vec()),
    };
    Ok(value)
}

/// Encode `value` as a field of `kind` starting at `offset`.
pub fn encode_field(
    buffer: &mut [u8],
    offset: usize,
    kind: FieldKind,
    value: &FieldValue,
    order: &ByteOrder,
) -> Result<()> {
    if value.kind() != kind {
        return Err(BridgeError::TypeConversion {
            details: format!("Expected {:?}, got {:?}", kind, value.kind()),
        });
    }

    match value {
        FieldValue::Byte(v) => write_u8(buffer, offset, *v),
        FieldValue::Bool(v) => write_u8(buffer, offset, u8::from(*v)),
        FieldValue::Int32(v) => write_u32(buffer, offset, *v as u32, order),
        FieldValue::UInt32(v) => write_u32(buffer, offset, *v, order),
        FieldValue::Float32(v) => write_u32(buffer, offset, v.to_bits(), order),
        FieldValue::Int64(v) => write_u64(buffer, offset, *v as u64, order),
        FieldValue::Float64(v) => write_u64(buffer, offset, v.to_bits(), order),
        FieldValue::Vector3(v) => write_vector3(buffer, offset, *v, order),
        FieldValue::Bytes(bytes) => {
            field_slice_mut(buffer, offset, bytes.len())?.copy_from_slice(bytes);
            Ok(())
        }
    }
}

fn field_slice(buffer: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or_else(|| BridgeError::layout("buffer", offset, len))
}

fn field_slice_mut(buffer: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get_mut(offset..end))
        .ok_or_else(|| BridgeError::layout("buffer", offset, len))
}

fn array<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(field_slice(buffer, offset, N)?);
    Ok(bytes)
}

pub fn read_u8(buffer: &[u8], offset: usize) -> Result<u8> {
    buffer.get(offset).copied().ok_or_else(|| BridgeError::layout("buffer", offset, SIZE_BYTE))
}

pub fn read_u32(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<u32> {
    Ok(order.read_u32(array::<4>(buffer, offset)?))
}

pub fn read_i32(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<i32> {
    Ok(read_u32(buffer, offset, order)? as i32)
}

pub fn read_f32(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<f32> {
    Ok(f32::from_bits(read_u32(buffer, offset, order)?))
}

pub fn read_i64(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<i64> {
    Ok(order.read_u64(array::<8>(buffer, offset)?) as i64)
}

pub fn read_f64(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<f64> {
    Ok(f64::from_bits(order.read_u64(array::<8>(buffer, offset)?)))
}

/// Three consecutive float reads.
pub fn read_vector3(buffer: &[u8], offset: usize, order: &ByteOrder) -> Result<Vector3> {
    Ok(Vector3 {
        x: read_f32(buffer, offset, order)?,
        y: read_f32(buffer, offset + SIZE_FLOAT, order)?,
        z: read_f32(buffer, offset + 2 * SIZE_FLOAT, order)?,
    })
}

/// NUL-terminated string inside a fixed-length byte array.
pub fn read_string(buffer: &[u8], offset: usize, len: usize) -> Result<String> {
    let bytes = field_slice(buffer, offset, len)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

pub fn write_u8(buffer: &mut [u8], offset: usize, value: u8) -> Result<()> {
    let slot = buffer.get_mut(offset).ok_or_else(|| BridgeError::layout("buffer", offset, SIZE_BYTE))?;
    *slot = value;
    Ok(())
}

pub fn write_u32(buffer: &mut [u8], offset: usize, value: u32, order: &ByteOrder) -> Result<()> {
    field_slice_mut(buffer, offset, SIZE_INT)?.copy_from_slice(&order.write_u32(value));
    Ok(())
}

pub fn write_i32(buffer: &mut [u8], offset: usize, value: i32, order: &ByteOrder) -> Result<()> {
    write_u32(buffer, offset, value as u32, order)
}

pub fn write_f32(buffer: &mut [u8], offset: usize, value: f32, order: &ByteOrder) -> Result<()> {
    write_u32(buffer, offset, value.to_bits(), order)
}

pub fn write_u64(buffer: &mut [u8], offset: usize, value: u64, order: &ByteOrder) -> Result<()> {
    field_slice_mut(buffer, offset, SIZE_LONG)?.copy_from_slice(&order.write_u64(value));
    Ok(())
}

pub fn write_f64(buffer: &mut [u8], offset: usize, value: f64, order: &ByteOrder) -> Result<()> {
    write_u64(buffer, offset, value.to_bits(), order)
}

pub fn write_vector3(buffer: &mut [u8], offset: usize, value: Vector3, order: &ByteOrder) -> Result<()> {
    write_f32(buffer, offset, value.x, order)?;
    write_f32(buffer, offset + SIZE_FLOAT, value.y, order)?;
    write_f32(buffer, offset + 2 * SIZE_FLOAT, value.z, order)
}

/// Write `value` NUL-padded into a fixed-length byte array, truncating if needed.
pub fn write_string(buffer: &mut [u8], offset: usize, len: usize, value: &str) -> Result<()> {
    let slot = field_slice_mut(buffer, offset, len)?;
    slot.fill(0);
    // Leave room for the terminator.
    let copied = value.len().min(len.saturating_sub(1));
    slot[..copied].copy_from_slice(&value.as_bytes()[..copied]);
    Ok(())
}

/// Check that `fields` do not overlap and all fit within `buffer_size`.
pub fn validate_fields(record: &str, fields: &[FieldSpec], buffer_size: usize) -> Result<()> {
    let mut sorted: Vec<&FieldSpec> = fields.iter().collect();
    sorted.sort_by_key(|f| f.offset);

    let mut cursor = 0usize;
    for field in sorted {
        if field.offset < cursor {
            return Err(BridgeError::layout(record, field.offset, field.kind.size()));
        }
        if field.end() > buffer_size {
            return Err(BridgeError::layout(record, field.offset, field.kind.size()));
        }
        cursor = field.end();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_byte_order() -> impl Strategy<Value = ByteOrder> {
        Just(vec![0u8, 1, 2, 3])
            .prop_shuffle()
            .prop_map(|v| ByteOrder::new([v[0], v[1], v[2], v[3]]).unwrap())
    }

    proptest! {
        #[test]
        fn prop_raw_four_bytes_survive_decode_encode(order in arb_byte_order(), bytes in any::<[u8; 4]>()) {
            let value = decode_field(&bytes, 0, FieldKind::UInt32, &order).unwrap();
            let mut out = [0u8; 4];
            encode_field(&mut out, 0, FieldKind::UInt32, &value, &order).unwrap();
            prop_assert_eq!(out, bytes);
        }

        #[test]
        fn prop_reads_past_the_end_fail_cleanly(len in 0usize..16, offset in 0usize..32) {
            let buffer = vec![0u8; len];
            let result = read_i32(&buffer, offset, &ByteOrder::native());
            prop_assert_eq!(result.is_ok(), offset + 4 <= len);
        }
    }

    #[test]
    fn vector3_decodes_as_three_floats() {
        let order = ByteOrder::BIG_ENDIAN;
        let mut buffer = [0u8; 14];
        write_vector3(&mut buffer, 2, Vector3::new(1.5, -2.0, 300.25), &order).unwrap();

        assert_eq!(&buffer[2..6], &1.5f32.to_be_bytes());
        assert_eq!(read_f32(&buffer, 10, &order).unwrap(), 300.25);
        assert_eq!(
            decode_field(&buffer, 2, FieldKind::Vector3, &order).unwrap(),
            FieldValue::Vector3(Vector3::new(1.5, -2.0, 300.25))
        );
    }

    #[test]
    fn encode_rejects_mismatched_kind() {
        let mut buffer = [0u8; 8];
        let err = encode_field(
            &mut buffer,
            0,
            FieldKind::Float64,
            &FieldValue::Int32(3),
            &ByteOrder::native(),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::TypeConversion { .. }));
    }

    #[test]
    fn strings_are_nul_padded_and_truncated() {
        let mut buffer = [0xFFu8; 8];
        write_string(&mut buffer, 0, 8, "Spa-Francorchamps").unwrap();
        assert_eq!(buffer[7], 0);
        assert_eq!(read_string(&buffer, 0, 8).unwrap(), "Spa-Fra");

        write_string(&mut buffer, 0, 8, "Imola").unwrap();
        assert_eq!(&buffer[5..], &[0, 0, 0]);
        assert_eq!(read_string(&buffer, 0, 8).unwrap(), "Imola");
    }

    #[test]
    fn float64_uses_word_order_of_permutation() {
        let mut buffer = [0u8; 8];
        write_f64(&mut buffer, 0, 1234.5678, &ByteOrder::BIG_ENDIAN).unwrap();
        assert_eq!(buffer, 1234.5678f64.to_be_bytes());
        assert_eq!(read_f64(&buffer, 0, &ByteOrder::BIG_ENDIAN).unwrap(), 1234.5678);
    }

    #[test]
    fn overlapping_fields_are_detected() {
        let fields = [
            FieldSpec::new("a", 0, FieldKind::Int32),
            FieldSpec::new("b", 2, FieldKind::Float32),
        ];
        assert!(validate_fields("Test", &fields, 16).is_err());

        let fields = [
            FieldSpec::new("a", 0, FieldKind::Int32),
            FieldSpec::new("b", 4, FieldKind::Float64),
        ];
        assert!(validate_fields("Test", &fields, 12).is_ok());
        assert!(validate_fields("Test", &fields, 11).is_err());
    }
}
