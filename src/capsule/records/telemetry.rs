//! Player vehicle telemetry record

use crate::capsule::codec::{SIZE_BYTE, SIZE_FLOAT, SIZE_INT, SIZE_VECTOR3};
use crate::capsule::{Capsule, CapsuleLayout, FieldKind, FieldSpec, Vector3};

const NAME_LEN: usize = 64;
const DENT_ZONES: usize = 8;

const OFFSET_DELTA_TIME: usize = 0;
const OFFSET_LAP_NUMBER: usize = OFFSET_DELTA_TIME + SIZE_FLOAT;
const OFFSET_LAP_START_ET: usize = OFFSET_LAP_NUMBER + SIZE_INT;
const OFFSET_VEHICLE_NAME: usize = OFFSET_LAP_START_ET + SIZE_FLOAT;
const OFFSET_TRACK_NAME: usize = OFFSET_VEHICLE_NAME + NAME_LEN;
const OFFSET_POS: usize = OFFSET_TRACK_NAME + NAME_LEN;
const OFFSET_LOCAL_VEL: usize = OFFSET_POS + SIZE_VECTOR3;
const OFFSET_LOCAL_ACCEL: usize = OFFSET_LOCAL_VEL + SIZE_VECTOR3;
const OFFSET_ORI: usize = OFFSET_LOCAL_ACCEL + SIZE_VECTOR3;
const OFFSET_GEAR: usize = OFFSET_ORI + 3 * SIZE_VECTOR3;
const OFFSET_ENGINE_RPM: usize = OFFSET_GEAR + SIZE_INT;
const OFFSET_ENGINE_WATER_TEMP: usize = OFFSET_ENGINE_RPM + SIZE_FLOAT;
const OFFSET_ENGINE_OIL_TEMP: usize = OFFSET_ENGINE_WATER_TEMP + SIZE_FLOAT;
const OFFSET_CLUTCH_RPM: usize = OFFSET_ENGINE_OIL_TEMP + SIZE_FLOAT;
const OFFSET_UNFILTERED_THROTTLE: usize = OFFSET_CLUTCH_RPM + SIZE_FLOAT;
const OFFSET_UNFILTERED_BRAKE: usize = OFFSET_UNFILTERED_THROTTLE + SIZE_FLOAT;
const OFFSET_UNFILTERED_STEERING: usize = OFFSET_UNFILTERED_BRAKE + SIZE_FLOAT;
const OFFSET_UNFILTERED_CLUTCH: usize = OFFSET_UNFILTERED_STEERING + SIZE_FLOAT;
const OFFSET_FUEL: usize = OFFSET_UNFILTERED_CLUTCH + SIZE_FLOAT;
const OFFSET_ENGINE_MAX_RPM: usize = OFFSET_FUEL + SIZE_FLOAT;
const OFFSET_SCHEDULED_STOPS: usize = OFFSET_ENGINE_MAX_RPM + SIZE_FLOAT;
const OFFSET_OVERHEATING: usize = OFFSET_SCHEDULED_STOPS + SIZE_BYTE;
const OFFSET_DETACHED: usize = OFFSET_OVERHEATING + SIZE_BYTE;
const OFFSET_DENT_SEVERITY: usize = OFFSET_DETACHED + SIZE_BYTE;
const OFFSET_LAST_IMPACT_ET: usize = OFFSET_DENT_SEVERITY + DENT_ZONES;
const OFFSET_LAST_IMPACT_MAGNITUDE: usize = OFFSET_LAST_IMPACT_ET + SIZE_FLOAT;
const OFFSET_LAST_IMPACT_POS: usize = OFFSET_LAST_IMPACT_MAGNITUDE + SIZE_FLOAT;

const BUFFER_SIZE: usize = OFFSET_LAST_IMPACT_POS + SIZE_VECTOR3;

const _: () = assert!(BUFFER_SIZE == 287);

/// Telemetry of the player's vehicle, refreshed every physics tick.
pub struct TelemetryData;

pub type TelemetryDataCapsule = Capsule<TelemetryData>;

impl CapsuleLayout for TelemetryData {
    const NAME: &'static str = "TelemetryData";
    const BUFFER_SIZE: usize = BUFFER_SIZE;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("delta_time", OFFSET_DELTA_TIME, FieldKind::Float32),
        FieldSpec::new("lap_number", OFFSET_LAP_NUMBER, FieldKind::Int32),
        FieldSpec::new("lap_start_et", OFFSET_LAP_START_ET, FieldKind::Float32),
        FieldSpec::new("vehicle_name", OFFSET_VEHICLE_NAME, FieldKind::Bytes(NAME_LEN)),
        FieldSpec::new("track_name", OFFSET_TRACK_NAME, FieldKind::Bytes(NAME_LEN)),
        FieldSpec::new("pos", OFFSET_POS, FieldKind::Vector3),
        FieldSpec::new("local_vel", OFFSET_LOCAL_VEL, FieldKind::Vector3),
        FieldSpec::new("local_accel", OFFSET_LOCAL_ACCEL, FieldKind::Vector3),
        FieldSpec::new("ori_x", OFFSET_ORI, FieldKind::Vector3),
        FieldSpec::new("ori_y", OFFSET_ORI + SIZE_VECTOR3, FieldKind::Vector3),
        FieldSpec::new("ori_z", OFFSET_ORI + 2 * SIZE_VECTOR3, FieldKind::Vector3),
        FieldSpec::new("gear", OFFSET_GEAR, FieldKind::Int32),
        FieldSpec::new("engine_rpm", OFFSET_ENGINE_RPM, FieldKind::Float32),
        FieldSpec::new("engine_water_temp", OFFSET_ENGINE_WATER_TEMP, FieldKind::Float32),
        FieldSpec::new("engine_oil_temp", OFFSET_ENGINE_OIL_TEMP, FieldKind::Float32),
        FieldSpec::new("clutch_rpm", OFFSET_CLUTCH_RPM, FieldKind::Float32),
        FieldSpec::new("unfiltered_throttle", OFFSET_UNFILTERED_THROTTLE, FieldKind::Float32),
        FieldSpec::new("unfiltered_brake", OFFSET_UNFILTERED_BRAKE, FieldKind::Float32),
        FieldSpec::new("unfiltered_steering", OFFSET_UNFILTERED_STEERING, FieldKind::Float32),
        FieldSpec::new("unfiltered_clutch", OFFSET_UNFILTERED_CLUTCH, FieldKind::Float32),
        FieldSpec::new("fuel", OFFSET_FUEL, FieldKind::Float32),
        FieldSpec::new("engine_max_rpm", OFFSET_ENGINE_MAX_RPM, FieldKind::Float32),
        FieldSpec::new("scheduled_stops", OFFSET_SCHEDULED_STOPS, FieldKind::Byte),
        FieldSpec::new("overheating", OFFSET_OVERHEATING, FieldKind::Bool),
        FieldSpec::new("detached", OFFSET_DETACHED, FieldKind::Bool),
        FieldSpec::new("dent_severity", OFFSET_DENT_SEVERITY, FieldKind::Bytes(DENT_ZONES)),
        FieldSpec::new("last_impact_et", OFFSET_LAST_IMPACT_ET, FieldKind::Float32),
        FieldSpec::new("last_impact_magnitude", OFFSET_LAST_IMPACT_MAGNITUDE, FieldKind::Float32),
        FieldSpec::new("last_impact_pos", OFFSET_LAST_IMPACT_POS, FieldKind::Vector3),
    ];
}

impl Capsule<TelemetryData> {
    /// Seconds since the previous telemetry update.
    pub fn delta_time(&self) -> f32 {
        self.get_f32(OFFSET_DELTA_TIME)
    }

    pub fn lap_number(&self) -> i32 {
        self.get_i32(OFFSET_LAP_NUMBER)
    }

    pub fn lap_start_et(&self) -> f32 {
        self.get_f32(OFFSET_LAP_START_ET)
    }

    pub fn vehicle_name(&self) -> String {
        self.get_string(OFFSET_VEHICLE_NAME, NAME_LEN)
    }

    pub fn track_name(&self) -> String {
        self.get_string(OFFSET_TRACK_NAME, NAME_LEN)
    }

    /// World position of the vehicle.
    pub fn position(&self) -> Vector3 {
        self.get_vector3(OFFSET_POS)
    }

    /// Velocity in vehicle-local coordinates.
    pub fn local_velocity(&self) -> Vector3 {
        self.get_vector3(OFFSET_LOCAL_VEL)
    }

    pub fn local_acceleration(&self) -> Vector3 {
        self.get_vector3(OFFSET_LOCAL_ACCEL)
    }

    pub fn orientation(&self) -> [Vector3; 3] {
        [
            self.get_vector3(OFFSET_ORI),
            self.get_vector3(OFFSET_ORI + SIZE_VECTOR3),
            self.get_vector3(OFFSET_ORI + 2 * SIZE_VECTOR3),
        ]
    }

    /// -1 = reverse, 0 = neutral
    pub fn gear(&self) -> i32 {
        self.get_i32(OFFSET_GEAR)
    }

    pub fn engine_rpm(&self) -> f32 {
        self.get_f32(OFFSET_ENGINE_RPM)
    }

    pub fn engine_max_rpm(&self) -> f32 {
        self.get_f32(OFFSET_ENGINE_MAX_RPM)
    }

    pub fn engine_water_temperature(&self) -> f32 {
        self.get_f32(OFFSET_ENGINE_WATER_TEMP)
    }

    pub fn engine_oil_temperature(&self) -> f32 {
        self.get_f32(OFFSET_ENGINE_OIL_TEMP)
    }

    pub fn clutch_rpm(&self) -> f32 {
        self.get_f32(OFFSET_CLUTCH_RPM)
    }

    pub fn unfiltered_throttle(&self) -> f32 {
        self.get_f32(OFFSET_UNFILTERED_THROTTLE)
    }

    pub fn unfiltered_brake(&self) -> f32 {
        self.get_f32(OFFSET_UNFILTERED_BRAKE)
    }

    pub fn unfiltered_steering(&self) -> f32 {
        self.get_f32(OFFSET_UNFILTERED_STEERING)
    }

    pub fn unfiltered_clutch(&self) -> f32 {
        self.get_f32(OFFSET_UNFILTERED_CLUTCH)
    }

    pub fn fuel(&self) -> f32 {
        self.get_f32(OFFSET_FUEL)
    }

    pub fn scheduled_stops(&self) -> u8 {
        self.get_u8(OFFSET_SCHEDULED_STOPS)
    }

    pub fn is_overheating(&self) -> bool {
        self.get_bool(OFFSET_OVERHEATING)
    }

    pub fn has_detached_parts(&self) -> bool {
        self.get_bool(OFFSET_DETACHED)
    }

    /// Dent severity per body zone (0 = none, 2 = heavy).
    pub fn dent_severity(&self) -> [u8; DENT_ZONES] {
        let mut zones = [0u8; DENT_ZONES];
        for (i, zone) in zones.iter_mut().enumerate() {
            *zone = self.get_u8(OFFSET_DENT_SEVERITY + i);
        }
        zones
    }

    pub fn last_impact_et(&self) -> f32 {
        self.get_f32(OFFSET_LAST_IMPACT_ET)
    }

    pub fn last_impact_magnitude(&self) -> f32 {
        self.get_f32(OFFSET_LAST_IMPACT_MAGNITUDE)
    }

    pub fn last_impact_position(&self) -> Vector3 {
        self.get_vector3(OFFSET_LAST_IMPACT_POS)
    }

    pub fn set_lap_number(&mut self, lap: i32) {
        self.put_i32(OFFSET_LAP_NUMBER, lap);
    }

    pub fn set_vehicle_name(&mut self, name: &str) {
        self.put_string(OFFSET_VEHICLE_NAME, NAME_LEN, name);
    }

    pub fn set_track_name(&mut self, name: &str) {
        self.put_string(OFFSET_TRACK_NAME, NAME_LEN, name);
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.put_vector3(OFFSET_POS, position);
    }

    pub fn set_gear(&mut self, gear: i32) {
        self.put_i32(OFFSET_GEAR, gear);
    }

    pub fn set_engine_rpm(&mut self, rpm: f32) {
        self.put_f32(OFFSET_ENGINE_RPM, rpm);
    }

    pub fn set_fuel(&mut self, fuel: f32) {
        self.put_f32(OFFSET_FUEL, fuel);
    }

    pub fn set_dent_severity(&mut self, zones: [u8; DENT_ZONES]) {
        for (i, zone) in zones.into_iter().enumerate() {
            self.put_u8(OFFSET_DENT_SEVERITY + i, zone);
        }
    }
}
