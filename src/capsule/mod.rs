//! Fixed-layout binary records exchanged with the host.
//!
//! Every record the host hands across (graphics info, telemetry, scoring) is a
//! flat byte array of a size known at compile time. A [`Capsule`] owns one such
//! buffer and decodes fields at constant offsets through the injected
//! [`ByteOrder`].
//!
//! ## Lifecycle
//!
//! A capsule is allocated once per record type and refilled every frame by
//! [`Capsule::fill_from_stream`]. The fill reads into a scratch buffer and only
//! swaps it in once the record is complete, so a short read never exposes a
//! partially overwritten capsule.
//!
//! ## Example
//!
//! ```rust
//! use hudbridge::capsule::{ByteOrder, Capsule, GraphicsInfo, Vector3};
//!
//! let order = ByteOrder::LITTLE_ENDIAN;
//! let mut source = Capsule::<GraphicsInfo>::new(order);
//! source.set_camera_position(Vector3::new(1.0, 2.0, 3.0));
//!
//! let mut wire = Vec::new();
//! source.write_to_stream(&mut wire).unwrap();
//!
//! let mut capsule = Capsule::<GraphicsInfo>::new(order);
//! capsule.fill_from_stream(&mut wire.as_slice()).unwrap();
//! assert_eq!(capsule.camera_position(), Vector3::new(1.0, 2.0, 3.0));
//! ```

mod byte_order;
pub mod codec;
mod records;
mod vector;

pub use byte_order::{ByteOrder, PROBE_MARKER};
pub use codec::{FieldKind, FieldSpec, FieldValue, decode_field, encode_field};
pub use records::{
    CONTROL_NAME_LEN, DEVICE_NAME_LEN, GraphicsInfo, GraphicsInfoCapsule, InputDevice, InputDeviceInfo,
    MAX_VEHICLES, ScoringInfo, ScoringInfoCapsule, TelemetryData, TelemetryDataCapsule, VehicleScoring,
    VehicleScoringCapsule,
};
pub use vector::{Vector3, nearest_to};

use crate::{BridgeError, Result};
use std::io::{ErrorKind, Read, Write};
use std::marker::PhantomData;
use tracing::{trace, warn};

/// Static description of a record's wire layout.
pub trait CapsuleLayout {
    /// Record name used in logs and errors.
    const NAME: &'static str;
    /// Total size of the record in bytes.
    const BUFFER_SIZE: usize;
    /// Every field of the record, in wire order.
    const FIELDS: &'static [FieldSpec];
}

/// One fixed-size binary record.
pub struct Capsule<L: CapsuleLayout> {
    buffer: Box<[u8]>,
    scratch: Box<[u8]>,
    order: ByteOrder,
    update_id: u64,
    _layout: PhantomData<fn() -> L>,
}

impl<L: CapsuleLayout> Capsule<L> {
    /// Allocate a zeroed capsule decoding with `order`.
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buffer: vec![0u8; L::BUFFER_SIZE].into_boxed_slice(),
            scratch: vec![0u8; L::BUFFER_SIZE].into_boxed_slice(),
            order,
            update_id: 0,
            _layout: PhantomData,
        }
    }

    /// Record size in bytes.
    pub const fn buffer_size(&self) -> usize {
        L::BUFFER_SIZE
    }

    /// Byte order used for every multi-byte field.
    pub fn byte_order(&self) -> &ByteOrder {
        &self.order
    }

    /// Number of successful fills since allocation.
    pub fn update_id(&self) -> u64 {
        self.update_id
    }

    /// Raw record bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Raw record bytes for in-place writes by the host.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Replace the record with a complete copy of `bytes`.
    pub fn fill_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < L::BUFFER_SIZE {
            return Err(BridgeError::truncated_capsule(L::NAME, L::BUFFER_SIZE, bytes.len()));
        }
        self.buffer.copy_from_slice(&bytes[..L::BUFFER_SIZE]);
        self.update_id += 1;
        Ok(())
    }

    /// Read exactly one record from `reader`.
    ///
    /// Loops until [`CapsuleLayout::BUFFER_SIZE`] bytes have arrived. End of stream
    /// before that is a [`BridgeError::TruncatedCapsule`] and leaves the previous
    /// record contents untouched.
    pub fn fill_from_stream<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let mut filled = 0usize;
        while filled < L::BUFFER_SIZE {
            match reader.read(&mut self.scratch[filled..]) {
                Ok(0) => {
                    warn!(
                        record = L::NAME,
                        expected = L::BUFFER_SIZE,
                        received = filled,
                        "Stream ended inside capsule"
                    );
                    return Err(BridgeError::truncated_capsule(L::NAME, L::BUFFER_SIZE, filled));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(BridgeError::io(format!("reading {} capsule", L::NAME), e));
                }
            }
        }

        std::mem::swap(&mut self.buffer, &mut self.scratch);
        self.update_id += 1;
        trace!(record = L::NAME, update_id = self.update_id, "Capsule filled");
        Ok(())
    }

    /// Take over the record held by `staged` and count it as one update.
    ///
    /// Only buffers are exchanged; `staged` is left holding the previous record.
    pub(crate) fn commit_staged(&mut self, staged: &mut Self) {
        std::mem::swap(&mut self.buffer, &mut staged.buffer);
        self.update_id += 1;
    }

    /// Write the full record to `writer`.
    pub fn write_to_stream<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(&self.buffer)
            .map_err(|e| BridgeError::io(format!("writing {} capsule", L::NAME), e))
    }

    /// Decode the field of `kind` at `offset`.
    pub fn decode(&self, offset: usize, kind: FieldKind) -> Result<FieldValue> {
        decode_field(&self.buffer, offset, kind, &self.order).map_err(|e| relabel::<L>(e))
    }

    /// Encode `value` as a field of `kind` at `offset`.
    pub fn encode(&mut self, offset: usize, kind: FieldKind, value: &FieldValue) -> Result<()> {
        encode_field(&mut self.buffer, offset, kind, value, &self.order).map_err(|e| relabel::<L>(e))
    }

    /// Decode a field by its layout name.
    pub fn field(&self, name: &str) -> Result<FieldValue> {
        let spec = L::FIELDS
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BridgeError::TypeConversion {
                details: format!("{} has no field '{}'", L::NAME, name),
            })?;
        self.decode(spec.offset, spec.kind)
    }

    // Typed accessors below rely on the const layout assertions in `records`,
    // which guarantee every offset + size lies within BUFFER_SIZE.

    fn bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[offset..offset + N]);
        out
    }

    pub(crate) fn get_u8(&self, offset: usize) -> u8 {
        self.buffer[offset]
    }

    pub(crate) fn get_bool(&self, offset: usize) -> bool {
        self.buffer[offset] != 0
    }

    pub(crate) fn get_i32(&self, offset: usize) -> i32 {
        self.order.read_u32(self.bytes::<4>(offset)) as i32
    }

    pub(crate) fn get_f32(&self, offset: usize) -> f32 {
        f32::from_bits(self.order.read_u32(self.bytes::<4>(offset)))
    }

    pub(crate) fn get_i64(&self, offset: usize) -> i64 {
        self.order.read_u64(self.bytes::<8>(offset)) as i64
    }

    pub(crate) fn get_f64(&self, offset: usize) -> f64 {
        f64::from_bits(self.order.read_u64(self.bytes::<8>(offset)))
    }

    pub(crate) fn get_vector3(&self, offset: usize) -> Vector3 {
        Vector3 {
            x: self.get_f32(offset),
            y: self.get_f32(offset + codec::SIZE_FLOAT),
            z: self.get_f32(offset + 2 * codec::SIZE_FLOAT),
        }
    }

    pub(crate) fn get_string(&self, offset: usize, len: usize) -> String {
        let bytes = &self.buffer[offset..offset + len];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    pub(crate) fn put_u8(&mut self, offset: usize, value: u8) {
        self.buffer[offset] = value;
    }

    pub(crate) fn put_i32(&mut self, offset: usize, value: i32) {
        self.buffer[offset..offset + 4].copy_from_slice(&self.order.write_u32(value as u32));
    }

    pub(crate) fn put_f32(&mut self, offset: usize, value: f32) {
        self.buffer[offset..offset + 4].copy_from_slice(&self.order.write_u32(value.to_bits()));
    }

    pub(crate) fn put_i64(&mut self, offset: usize, value: i64) {
        self.buffer[offset..offset + 8].copy_from_slice(&self.order.write_u64(value as u64));
    }

    pub(crate) fn put_f64(&mut self, offset: usize, value: f64) {
        self.buffer[offset..offset + 8].copy_from_slice(&self.order.write_u64(value.to_bits()));
    }

    pub(crate) fn put_vector3(&mut self, offset: usize, value: Vector3) {
        self.put_f32(offset, value.x);
        self.put_f32(offset + codec::SIZE_FLOAT, value.y);
        self.put_f32(offset + 2 * codec::SIZE_FLOAT, value.z);
    }

    pub(crate) fn put_string(&mut self, offset: usize, len: usize, value: &str) {
        let slot = &mut self.buffer[offset..offset + len];
        slot.fill(0);
        let copied = value.len().min(len.saturating_sub(1));
        slot[..copied].copy_from_slice(&value.as_bytes()[..copied]);
    }
}

impl<L: CapsuleLayout> Clone for Capsule<L> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            scratch: vec![0u8; L::BUFFER_SIZE].into_boxed_slice(),
            order: self.order,
            update_id: self.update_id,
            _layout: PhantomData,
        }
    }
}

impl<L: CapsuleLayout> std::fmt::Debug for Capsule<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capsule")
            .field("record", &L::NAME)
            .field("size", &L::BUFFER_SIZE)
            .field("update_id", &self.update_id)
            .field("order", &self.order)
            .finish()
    }
}

fn relabel<L: CapsuleLayout>(error: BridgeError) -> BridgeError {
    match error {
        BridgeError::Layout { offset, len, .. } => BridgeError::layout(L::NAME, offset, len),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn sample_graphics(order: ByteOrder) -> Capsule<GraphicsInfo> {
        let mut capsule = Capsule::<GraphicsInfo>::new(order);
        capsule.set_camera_position(Vector3::new(10.0, -4.5, 2.25));
        capsule.set_ambient_color(0.25, 0.5, 0.75);
        capsule
    }

    #[test]
    fn fill_from_stream_loops_over_short_reads() {
        let wire = sample_graphics(ByteOrder::BIG_ENDIAN).as_bytes().to_vec();
        let mut capsule = Capsule::<GraphicsInfo>::new(ByteOrder::BIG_ENDIAN);

        capsule.fill_from_stream(&mut Trickle { data: &wire, chunk: 3 }).unwrap();

        assert_eq!(capsule.as_bytes(), wire.as_slice());
        assert_eq!(capsule.update_id(), 1);
        assert_eq!(capsule.camera_position(), Vector3::new(10.0, -4.5, 2.25));
    }

    #[test]
    fn truncated_stream_leaves_previous_record_intact() {
        let order = ByteOrder::LITTLE_ENDIAN;
        let previous = sample_graphics(order);
        let mut capsule = previous.clone();

        let short = vec![0xAB; GraphicsInfo::BUFFER_SIZE - 1];
        let err = capsule.fill_from_stream(&mut Cursor::new(short)).unwrap_err();

        match err {
            BridgeError::TruncatedCapsule { record, expected, received } => {
                assert_eq!(record, "GraphicsInfo");
                assert_eq!(expected, GraphicsInfo::BUFFER_SIZE);
                assert_eq!(received, GraphicsInfo::BUFFER_SIZE - 1);
            }
            other => panic!("Expected TruncatedCapsule, got {other:?}"),
        }
        assert_eq!(capsule.as_bytes(), previous.as_bytes());
        assert_eq!(capsule.update_id(), previous.update_id());
    }

    #[test]
    fn fill_from_slice_rejects_short_input() {
        let mut capsule = Capsule::<GraphicsInfo>::new(ByteOrder::native());
        assert!(capsule.fill_from_slice(&[0u8; 4]).is_err());
        assert_eq!(capsule.update_id(), 0);
    }

    #[test]
    fn field_lookup_by_name_matches_typed_accessor() {
        let capsule = sample_graphics(ByteOrder::BIG_ENDIAN);
        assert_eq!(
            capsule.field("cam_pos").unwrap(),
            FieldValue::Vector3(Vector3::new(10.0, -4.5, 2.25))
        );
        assert_eq!(capsule.field("ambient_green").unwrap(), FieldValue::Float64(0.5));
        assert!(capsule.field("no_such_field").is_err());
    }

    #[test]
    fn out_of_layout_access_names_the_record() {
        let capsule = Capsule::<GraphicsInfo>::new(ByteOrder::native());
        let err = capsule.decode(GraphicsInfo::BUFFER_SIZE - 2, FieldKind::Int32).unwrap_err();
        assert!(matches!(err, BridgeError::Layout { ref record, .. } if record == "GraphicsInfo"));
    }

    proptest! {
        #[test]
        fn prop_any_stream_shorter_than_record_is_rejected(len in 0usize..GraphicsInfo::BUFFER_SIZE) {
            let mut capsule = Capsule::<GraphicsInfo>::new(ByteOrder::native());
            let result = capsule.fill_from_stream(&mut Cursor::new(vec![1u8; len]));
            prop_assert!(
                matches!(result, Err(BridgeError::TruncatedCapsule { received, .. }) if received == len),
                "short stream must fail with TruncatedCapsule"
            );
            prop_assert!(capsule.as_bytes().iter().all(|&b| b == 0));
        }
    }
}
