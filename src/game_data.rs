//! Aggregate of every capsule the host refreshes.
//!
//! [`LiveGameData`] owns one capsule per record type plus a pool of vehicle
//! capsules sized for [`MAX_VEHICLES`]. The pool and a staging capsule for
//! the scoring header are allocated up front and reused, so refilling scoring
//! each frame does not allocate.

use std::io::Read;

use tracing::{debug, trace};

use crate::capsule::{
    ByteOrder, GraphicsInfoCapsule, MAX_VEHICLES, ScoringInfoCapsule, TelemetryDataCapsule,
    VehicleScoringCapsule, nearest_to,
};
use crate::{BridgeError, Result};

/// Latest decoded state of the simulation.
#[derive(Debug, Clone)]
pub struct LiveGameData {
    order: ByteOrder,
    graphics: GraphicsInfoCapsule,
    telemetry: TelemetryDataCapsule,
    scoring: ScoringInfoCapsule,
    staged_scoring: ScoringInfoCapsule,
    vehicles: Vec<VehicleScoringCapsule>,
    vehicle_count: usize,
}

impl LiveGameData {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            graphics: GraphicsInfoCapsule::new(order),
            telemetry: TelemetryDataCapsule::new(order),
            scoring: ScoringInfoCapsule::new(order),
            staged_scoring: ScoringInfoCapsule::new(order),
            vehicles: (0..MAX_VEHICLES).map(|_| VehicleScoringCapsule::new(order)).collect(),
            vehicle_count: 0,
        }
    }

    pub fn byte_order(&self) -> &ByteOrder {
        &self.order
    }

    pub fn graphics(&self) -> &GraphicsInfoCapsule {
        &self.graphics
    }

    pub fn graphics_mut(&mut self) -> &mut GraphicsInfoCapsule {
        &mut self.graphics
    }

    pub fn telemetry(&self) -> &TelemetryDataCapsule {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryDataCapsule {
        &mut self.telemetry
    }

    pub fn scoring(&self) -> &ScoringInfoCapsule {
        &self.scoring
    }

    pub fn scoring_mut(&mut self) -> &mut ScoringInfoCapsule {
        &mut self.scoring
    }

    /// Vehicles from the most recent complete scoring update.
    pub fn vehicles(&self) -> &[VehicleScoringCapsule] {
        &self.vehicles[..self.vehicle_count]
    }

    /// Mutable access to the first `count` vehicle slots, for hosts that write
    /// scoring in place. `count` is clamped to [`MAX_VEHICLES`].
    pub fn vehicles_mut(&mut self, count: usize) -> &mut [VehicleScoringCapsule] {
        self.vehicle_count = count.min(MAX_VEHICLES);
        &mut self.vehicles[..self.vehicle_count]
    }

    pub fn fill_graphics_from_stream<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        self.graphics.fill_from_stream(reader)
    }

    pub fn fill_telemetry_from_stream<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        self.telemetry.fill_from_stream(reader)
    }

    /// Read the scoring header followed by exactly `num_vehicles` vehicle records.
    ///
    /// A bad header leaves everything untouched. A failure part way through the
    /// vehicle records keeps the previous header but publishes no vehicles until
    /// the next complete update, so [`vehicles`](Self::vehicles) never mixes
    /// records from two updates.
    pub fn fill_scoring_from_stream<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        self.staged_scoring.fill_from_stream(reader)?;

        let count = validate_vehicle_count(self.staged_scoring.num_vehicles())?;
        for slot in &mut self.vehicles[..count] {
            if let Err(e) = slot.fill_from_stream(reader) {
                self.vehicle_count = 0;
                return Err(e);
            }
        }

        self.scoring.commit_staged(&mut self.staged_scoring);
        self.vehicle_count = count;
        trace!(vehicles = count, update_id = self.scoring.update_id(), "Scoring filled");
        Ok(())
    }

    /// Index and squared distance of the vehicle nearest to the camera.
    ///
    /// Ties go to the vehicle listed first. `None` when no vehicles are known.
    pub fn nearest_vehicle_to_camera(&self) -> Option<(usize, f32)> {
        let camera = self.graphics.camera_position();
        nearest_to(camera, self.vehicles().iter().map(|v| v.position()))
    }

    /// The player's own vehicle, if present in the current scoring update.
    pub fn player_vehicle(&self) -> Option<&VehicleScoringCapsule> {
        self.vehicles().iter().find(|v| v.is_player())
    }
}

fn validate_vehicle_count(raw: i32) -> Result<usize> {
    match usize::try_from(raw) {
        Ok(count) if count <= MAX_VEHICLES => Ok(count),
        _ => {
            debug!(num_vehicles = raw, max = MAX_VEHICLES, "Rejecting scoring header");
            Err(BridgeError::layout("VehicleScoring", 0, raw.max(0) as usize))
        }
    }
}
