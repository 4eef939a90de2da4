//! Capsule recordings for offline replay
//!
//! A recording is a header followed by tagged capsule entries, exactly as the
//! host handed them over. Replaying one into a [`LiveGameData`] drives widgets
//! and the frame bridge without a running simulator.
//!
//! ## Format
//!
//! ```text
//! "HUDREC"  version: u16 (little endian)  byte order: [u8; 4]
//! entry*:   tag: u8  capsule bytes
//! ```
//!
//! Tags are `1` graphics, `2` telemetry and `3` scoring. A scoring entry is the
//! scoring header followed by its `num_vehicles` vehicle capsules.
//!
//! ## Usage Example
//!
//! ```rust
//! use hudbridge::capsule::ByteOrder;
//! use hudbridge::game_data::LiveGameData;
//! use hudbridge::recording::{RecordKind, RecordingReader, RecordingWriter};
//!
//! fn replay() -> hudbridge::Result<()> {
//!     let order = ByteOrder::LITTLE_ENDIAN;
//!     let live = LiveGameData::new(order);
//!
//!     let mut writer = RecordingWriter::new(Vec::new(), order)?;
//!     writer.write_graphics(live.graphics())?;
//!     let bytes = writer.finish()?;
//!
//!     let mut reader = RecordingReader::new(bytes.as_slice())?;
//!     let mut replayed = LiveGameData::new(reader.byte_order());
//!     while let Some(kind) = reader.next_into(&mut replayed)? {
//!         assert_eq!(kind, RecordKind::Graphics);
//!     }
//!     Ok(())
//! }
//! # replay().unwrap();
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::capsule::{ByteOrder, GraphicsInfoCapsule, ScoringInfoCapsule, TelemetryDataCapsule, VehicleScoringCapsule};
use crate::game_data::LiveGameData;
use crate::{BridgeError, Result};

pub const RECORDING_MAGIC: &[u8; 6] = b"HUDREC";
pub const PROTOCOL_VERSION: u16 = 1;

const HEADER_SIZE: usize = RECORDING_MAGIC.len() + 2 + 4;

/// Which record a replayed entry refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Graphics = 1,
    Telemetry = 2,
    Scoring = 3,
}

impl TryFrom<u8> for RecordKind {
    type Error = BridgeError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(RecordKind::Graphics),
            2 => Ok(RecordKind::Telemetry),
            3 => Ok(RecordKind::Scoring),
            other => Err(BridgeError::recording(format!("unknown entry tag {other}"))),
        }
    }
}

/// Appends capsule entries to a recording.
pub struct RecordingWriter<W: Write> {
    writer: W,
    order: ByteOrder,
    entries: u64,
}

impl RecordingWriter<BufWriter<File>> {
    /// Create (or truncate) a recording file.
    pub fn create<P: AsRef<Path>>(path: P, order: ByteOrder) -> Result<Self> {
        let file = File::create(&path).map_err(|e| {
            BridgeError::io(format!("creating recording {}", path.as_ref().display()), e)
        })?;
        info!(path = %path.as_ref().display(), "Recording capsules");
        Self::new(BufWriter::new(file), order)
    }
}

impl<W: Write> RecordingWriter<W> {
    /// Write the header and return a writer ready for entries.
    pub fn new(mut writer: W, order: ByteOrder) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        header[..6].copy_from_slice(RECORDING_MAGIC);
        header[6..8].copy_from_slice(&PROTOCOL_VERSION.to_le_bytes());
        header[8..].copy_from_slice(&order.permutation());
        writer.write_all(&header).map_err(|e| BridgeError::io("writing recording header", e))?;
        Ok(Self { writer, order, entries: 0 })
    }

    pub fn write_graphics(&mut self, capsule: &GraphicsInfoCapsule) -> Result<()> {
        self.check_order(capsule.byte_order())?;
        self.tag(RecordKind::Graphics)?;
        capsule.write_to_stream(&mut self.writer)
    }

    pub fn write_telemetry(&mut self, capsule: &TelemetryDataCapsule) -> Result<()> {
        self.check_order(capsule.byte_order())?;
        self.tag(RecordKind::Telemetry)?;
        capsule.write_to_stream(&mut self.writer)
    }

    /// Write a scoring header and its vehicles. The header's vehicle count must
    /// match `vehicles`.
    pub fn write_scoring(
        &mut self,
        scoring: &ScoringInfoCapsule,
        vehicles: &[VehicleScoringCapsule],
    ) -> Result<()> {
        if usize::try_from(scoring.num_vehicles()).ok() != Some(vehicles.len()) {
            return Err(BridgeError::recording(format!(
                "scoring header announces {} vehicles but {} were supplied",
                scoring.num_vehicles(),
                vehicles.len()
            )));
        }
        self.check_order(scoring.byte_order())?;
        self.tag(RecordKind::Scoring)?;
        scoring.write_to_stream(&mut self.writer)?;
        for vehicle in vehicles {
            vehicle.write_to_stream(&mut self.writer)?;
        }
        Ok(())
    }

    /// Snapshot every record of `data` as three entries.
    pub fn write_snapshot(&mut self, data: &LiveGameData) -> Result<()> {
        self.write_graphics(data.graphics())?;
        self.write_telemetry(data.telemetry())?;
        self.write_scoring(data.scoring(), data.vehicles())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().map_err(|e| BridgeError::io("flushing recording", e))?;
        debug!(entries = self.entries, "Recording finished");
        Ok(self.writer)
    }

    fn tag(&mut self, kind: RecordKind) -> Result<()> {
        self.writer
            .write_all(&[kind as u8])
            .map_err(|e| BridgeError::io("writing recording entry tag", e))?;
        self.entries += 1;
        Ok(())
    }

    fn check_order(&self, order: &ByteOrder) -> Result<()> {
        if *order != self.order {
            return Err(BridgeError::recording(format!(
                "capsule byte order {:?} differs from recording byte order {:?}",
                order.permutation(),
                self.order.permutation()
            )));
        }
        Ok(())
    }
}

/// Replays a recording entry by entry.
pub struct RecordingReader<R: Read> {
    reader: R,
    order: ByteOrder,
    entries: u64,
}

impl RecordingReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path).map_err(|e| {
            BridgeError::io(format!("opening recording {}", path.as_ref().display()), e)
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> RecordingReader<R> {
    /// Read and validate the header.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => BridgeError::recording("file shorter than header"),
            _ => BridgeError::io("reading recording header", e),
        })?;

        if &header[..6] != RECORDING_MAGIC {
            return Err(BridgeError::recording("missing HUDREC magic"));
        }
        let version = u16::from_le_bytes([header[6], header[7]]);
        if version != PROTOCOL_VERSION {
            return Err(BridgeError::recording(format!(
                "unsupported protocol version {version} (expected {PROTOCOL_VERSION})"
            )));
        }
        let order = ByteOrder::new([header[8], header[9], header[10], header[11]])?;

        Ok(Self { reader, order, entries: 0 })
    }

    /// Byte order the recorded capsules were written with.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Entries replayed so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Replay the next entry into `data`.
    ///
    /// Returns `None` at a clean end of file. A file ending inside an entry is
    /// a [`BridgeError::TruncatedCapsule`].
    pub fn next_into(&mut self, data: &mut LiveGameData) -> Result<Option<RecordKind>> {
        if *data.byte_order() != self.order {
            return Err(BridgeError::recording(
                "target game data decodes with a different byte order than the recording",
            ));
        }

        let Some(tag) = self.read_tag()? else {
            debug!(entries = self.entries, "Recording exhausted");
            return Ok(None);
        };
        let kind = RecordKind::try_from(tag)?;

        match kind {
            RecordKind::Graphics => data.fill_graphics_from_stream(&mut self.reader)?,
            RecordKind::Telemetry => data.fill_telemetry_from_stream(&mut self.reader)?,
            RecordKind::Scoring => data.fill_scoring_from_stream(&mut self.reader)?,
        }
        self.entries += 1;
        Ok(Some(kind))
    }

    fn read_tag(&mut self) -> Result<Option<u8>> {
        let mut tag = [0u8; 1];
        loop {
            match self.reader.read(&mut tag) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(tag[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BridgeError::io("reading recording entry tag", e)),
            }
        }
    }
}
