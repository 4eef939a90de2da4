//! Session scoring header and per-vehicle scoring records

use crate::capsule::codec::{SIZE_BYTE, SIZE_FLOAT, SIZE_INT, SIZE_VECTOR3};
use crate::capsule::{Capsule, CapsuleLayout, FieldKind, FieldSpec, Vector3};

/// Upper bound on vehicles in one scoring update.
pub const MAX_VEHICLES: usize = 104;

const TRACK_NAME_LEN: usize = 64;
const PLAYER_NAME_LEN: usize = 32;
const SECTOR_COUNT: usize = 3;

const OFFSET_TRACK_NAME: usize = 0;
const OFFSET_SESSION: usize = OFFSET_TRACK_NAME + TRACK_NAME_LEN;
const OFFSET_CURRENT_ET: usize = OFFSET_SESSION + SIZE_INT;
const OFFSET_END_ET: usize = OFFSET_CURRENT_ET + SIZE_FLOAT;
const OFFSET_MAX_LAPS: usize = OFFSET_END_ET + SIZE_FLOAT;
const OFFSET_LAP_DIST: usize = OFFSET_MAX_LAPS + SIZE_INT;
const OFFSET_NUM_VEHICLES: usize = OFFSET_LAP_DIST + SIZE_FLOAT;
const OFFSET_GAME_PHASE: usize = OFFSET_NUM_VEHICLES + SIZE_INT;
const OFFSET_YELLOW_FLAG_STATE: usize = OFFSET_GAME_PHASE + SIZE_BYTE;
const OFFSET_SECTOR_FLAGS: usize = OFFSET_YELLOW_FLAG_STATE + SIZE_BYTE;
const OFFSET_START_LIGHT: usize = OFFSET_SECTOR_FLAGS + SECTOR_COUNT;
const OFFSET_NUM_RED_LIGHTS: usize = OFFSET_START_LIGHT + SIZE_BYTE;
const OFFSET_IN_REALTIME: usize = OFFSET_NUM_RED_LIGHTS + SIZE_BYTE;
const OFFSET_PLAYER_NAME: usize = OFFSET_IN_REALTIME + SIZE_BYTE;
const OFFSET_DARK_CLOUD: usize = OFFSET_PLAYER_NAME + PLAYER_NAME_LEN;
const OFFSET_RAINING: usize = OFFSET_DARK_CLOUD + SIZE_FLOAT;
const OFFSET_AMBIENT_TEMP: usize = OFFSET_RAINING + SIZE_FLOAT;
const OFFSET_TRACK_TEMP: usize = OFFSET_AMBIENT_TEMP + SIZE_FLOAT;
const OFFSET_WIND: usize = OFFSET_TRACK_TEMP + SIZE_FLOAT;

const SCORING_BUFFER_SIZE: usize = OFFSET_WIND + SIZE_VECTOR3;

const _: () = assert!(SCORING_BUFFER_SIZE == 156);

/// Session-wide scoring state. Followed on the wire by `num_vehicles`
/// [`VehicleScoring`] records.
pub struct ScoringInfo;

pub type ScoringInfoCapsule = Capsule<ScoringInfo>;

impl CapsuleLayout for ScoringInfo {
    const NAME: &'static str = "ScoringInfo";
    const BUFFER_SIZE: usize = SCORING_BUFFER_SIZE;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("track_name", OFFSET_TRACK_NAME, FieldKind::Bytes(TRACK_NAME_LEN)),
        FieldSpec::new("session", OFFSET_SESSION, FieldKind::Int32),
        FieldSpec::new("current_et", OFFSET_CURRENT_ET, FieldKind::Float32),
        FieldSpec::new("end_et", OFFSET_END_ET, FieldKind::Float32),
        FieldSpec::new("max_laps", OFFSET_MAX_LAPS, FieldKind::Int32),
        FieldSpec::new("lap_dist", OFFSET_LAP_DIST, FieldKind::Float32),
        FieldSpec::new("num_vehicles", OFFSET_NUM_VEHICLES, FieldKind::Int32),
        FieldSpec::new("game_phase", OFFSET_GAME_PHASE, FieldKind::Byte),
        FieldSpec::new("yellow_flag_state", OFFSET_YELLOW_FLAG_STATE, FieldKind::Byte),
        FieldSpec::new("sector_flags", OFFSET_SECTOR_FLAGS, FieldKind::Bytes(SECTOR_COUNT)),
        FieldSpec::new("start_light", OFFSET_START_LIGHT, FieldKind::Byte),
        FieldSpec::new("num_red_lights", OFFSET_NUM_RED_LIGHTS, FieldKind::Byte),
        FieldSpec::new("in_realtime", OFFSET_IN_REALTIME, FieldKind::Bool),
        FieldSpec::new("player_name", OFFSET_PLAYER_NAME, FieldKind::Bytes(PLAYER_NAME_LEN)),
        FieldSpec::new("dark_cloud", OFFSET_DARK_CLOUD, FieldKind::Float32),
        FieldSpec::new("raining", OFFSET_RAINING, FieldKind::Float32),
        FieldSpec::new("ambient_temp", OFFSET_AMBIENT_TEMP, FieldKind::Float32),
        FieldSpec::new("track_temp", OFFSET_TRACK_TEMP, FieldKind::Float32),
        FieldSpec::new("wind", OFFSET_WIND, FieldKind::Vector3),
    ];
}

impl Capsule<ScoringInfo> {
    pub fn track_name(&self) -> String {
        self.get_string(OFFSET_TRACK_NAME, TRACK_NAME_LEN)
    }

    /// Session index (practice, qualifying, warmup, race).
    pub fn session(&self) -> i32 {
        self.get_i32(OFFSET_SESSION)
    }

    /// Elapsed session time in seconds.
    pub fn current_et(&self) -> f32 {
        self.get_f32(OFFSET_CURRENT_ET)
    }

    pub fn end_et(&self) -> f32 {
        self.get_f32(OFFSET_END_ET)
    }

    pub fn max_laps(&self) -> i32 {
        self.get_i32(OFFSET_MAX_LAPS)
    }

    /// Track length in meters.
    pub fn lap_dist(&self) -> f32 {
        self.get_f32(OFFSET_LAP_DIST)
    }

    /// Vehicle count as sent by the host, unvalidated.
    pub fn num_vehicles(&self) -> i32 {
        self.get_i32(OFFSET_NUM_VEHICLES)
    }

    pub fn game_phase(&self) -> u8 {
        self.get_u8(OFFSET_GAME_PHASE)
    }

    pub fn yellow_flag_state(&self) -> u8 {
        self.get_u8(OFFSET_YELLOW_FLAG_STATE)
    }

    pub fn sector_flags(&self) -> [u8; SECTOR_COUNT] {
        [
            self.get_u8(OFFSET_SECTOR_FLAGS),
            self.get_u8(OFFSET_SECTOR_FLAGS + 1),
            self.get_u8(OFFSET_SECTOR_FLAGS + 2),
        ]
    }

    pub fn start_light(&self) -> u8 {
        self.get_u8(OFFSET_START_LIGHT)
    }

    pub fn num_red_lights(&self) -> u8 {
        self.get_u8(OFFSET_NUM_RED_LIGHTS)
    }

    pub fn in_realtime(&self) -> bool {
        self.get_bool(OFFSET_IN_REALTIME)
    }

    pub fn player_name(&self) -> String {
        self.get_string(OFFSET_PLAYER_NAME, PLAYER_NAME_LEN)
    }

    pub fn dark_cloud(&self) -> f32 {
        self.get_f32(OFFSET_DARK_CLOUD)
    }

    pub fn raining(&self) -> f32 {
        self.get_f32(OFFSET_RAINING)
    }

    pub fn ambient_temperature(&self) -> f32 {
        self.get_f32(OFFSET_AMBIENT_TEMP)
    }

    pub fn track_temperature(&self) -> f32 {
        self.get_f32(OFFSET_TRACK_TEMP)
    }

    pub fn wind(&self) -> Vector3 {
        self.get_vector3(OFFSET_WIND)
    }

    pub fn set_track_name(&mut self, name: &str) {
        self.put_string(OFFSET_TRACK_NAME, TRACK_NAME_LEN, name);
    }

    pub fn set_session(&mut self, session: i32) {
        self.put_i32(OFFSET_SESSION, session);
    }

    pub fn set_current_et(&mut self, seconds: f32) {
        self.put_f32(OFFSET_CURRENT_ET, seconds);
    }

    pub fn set_num_vehicles(&mut self, count: i32) {
        self.put_i32(OFFSET_NUM_VEHICLES, count);
    }

    pub fn set_game_phase(&mut self, phase: u8) {
        self.put_u8(OFFSET_GAME_PHASE, phase);
    }

    pub fn set_in_realtime(&mut self, realtime: bool) {
        self.put_u8(OFFSET_IN_REALTIME, u8::from(realtime));
    }

    pub fn set_player_name(&mut self, name: &str) {
        self.put_string(OFFSET_PLAYER_NAME, PLAYER_NAME_LEN, name);
    }
}

const DRIVER_NAME_LEN: usize = 32;
const VEHICLE_NAME_LEN: usize = 64;
const VEHICLE_CLASS_LEN: usize = 32;

const OFFSET_V_DRIVER_NAME: usize = 0;
const OFFSET_V_VEHICLE_NAME: usize = OFFSET_V_DRIVER_NAME + DRIVER_NAME_LEN;
const OFFSET_V_TOTAL_LAPS: usize = OFFSET_V_VEHICLE_NAME + VEHICLE_NAME_LEN;
const OFFSET_V_SECTOR: usize = OFFSET_V_TOTAL_LAPS + SIZE_INT;
const OFFSET_V_FINISH_STATUS: usize = OFFSET_V_SECTOR + SIZE_BYTE;
const OFFSET_V_LAP_DIST: usize = OFFSET_V_FINISH_STATUS + SIZE_BYTE;
const OFFSET_V_PATH_LATERAL: usize = OFFSET_V_LAP_DIST + SIZE_FLOAT;
const OFFSET_V_TRACK_EDGE: usize = OFFSET_V_PATH_LATERAL + SIZE_FLOAT;
const OFFSET_V_BEST_SECTOR1: usize = OFFSET_V_TRACK_EDGE + SIZE_FLOAT;
const OFFSET_V_BEST_SECTOR2: usize = OFFSET_V_BEST_SECTOR1 + SIZE_FLOAT;
const OFFSET_V_BEST_LAP_TIME: usize = OFFSET_V_BEST_SECTOR2 + SIZE_FLOAT;
const OFFSET_V_LAST_SECTOR1: usize = OFFSET_V_BEST_LAP_TIME + SIZE_FLOAT;
const OFFSET_V_LAST_SECTOR2: usize = OFFSET_V_LAST_SECTOR1 + SIZE_FLOAT;
const OFFSET_V_LAST_LAP_TIME: usize = OFFSET_V_LAST_SECTOR2 + SIZE_FLOAT;
const OFFSET_V_CUR_SECTOR1: usize = OFFSET_V_LAST_LAP_TIME + SIZE_FLOAT;
const OFFSET_V_CUR_SECTOR2: usize = OFFSET_V_CUR_SECTOR1 + SIZE_FLOAT;
const OFFSET_V_NUM_PITSTOPS: usize = OFFSET_V_CUR_SECTOR2 + SIZE_FLOAT;
const OFFSET_V_NUM_PENALTIES: usize = OFFSET_V_NUM_PITSTOPS + SIZE_INT;
const OFFSET_V_IS_PLAYER: usize = OFFSET_V_NUM_PENALTIES + SIZE_INT;
const OFFSET_V_CONTROL: usize = OFFSET_V_IS_PLAYER + SIZE_BYTE;
const OFFSET_V_IN_PITS: usize = OFFSET_V_CONTROL + SIZE_BYTE;
const OFFSET_V_PLACE: usize = OFFSET_V_IN_PITS + SIZE_BYTE;
const OFFSET_V_VEHICLE_CLASS: usize = OFFSET_V_PLACE + SIZE_BYTE;
const OFFSET_V_TIME_BEHIND_NEXT: usize = OFFSET_V_VEHICLE_CLASS + VEHICLE_CLASS_LEN;
const OFFSET_V_LAPS_BEHIND_NEXT: usize = OFFSET_V_TIME_BEHIND_NEXT + SIZE_FLOAT;
const OFFSET_V_TIME_BEHIND_LEADER: usize = OFFSET_V_LAPS_BEHIND_NEXT + SIZE_INT;
const OFFSET_V_LAPS_BEHIND_LEADER: usize = OFFSET_V_TIME_BEHIND_LEADER + SIZE_FLOAT;
const OFFSET_V_LAP_START_ET: usize = OFFSET_V_LAPS_BEHIND_LEADER + SIZE_INT;
const OFFSET_V_POS: usize = OFFSET_V_LAP_START_ET + SIZE_FLOAT;
const OFFSET_V_LOCAL_VEL: usize = OFFSET_V_POS + SIZE_VECTOR3;
const OFFSET_V_LOCAL_ACCEL: usize = OFFSET_V_LOCAL_VEL + SIZE_VECTOR3;
const OFFSET_V_ORI: usize = OFFSET_V_LOCAL_ACCEL + SIZE_VECTOR3;

const VEHICLE_BUFFER_SIZE: usize = OFFSET_V_ORI + 3 * SIZE_VECTOR3;

const _: () = assert!(VEHICLE_BUFFER_SIZE == 282);

/// Scoring state of one vehicle in the session.
pub struct VehicleScoring;

pub type VehicleScoringCapsule = Capsule<VehicleScoring>;

impl CapsuleLayout for VehicleScoring {
    const NAME: &'static str = "VehicleScoring";
    const BUFFER_SIZE: usize = VEHICLE_BUFFER_SIZE;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("driver_name", OFFSET_V_DRIVER_NAME, FieldKind::Bytes(DRIVER_NAME_LEN)),
        FieldSpec::new("vehicle_name", OFFSET_V_VEHICLE_NAME, FieldKind::Bytes(VEHICLE_NAME_LEN)),
        FieldSpec::new("total_laps", OFFSET_V_TOTAL_LAPS, FieldKind::Int32),
        FieldSpec::new("sector", OFFSET_V_SECTOR, FieldKind::Byte),
        FieldSpec::new("finish_status", OFFSET_V_FINISH_STATUS, FieldKind::Byte),
        FieldSpec::new("lap_dist", OFFSET_V_LAP_DIST, FieldKind::Float32),
        FieldSpec::new("path_lateral", OFFSET_V_PATH_LATERAL, FieldKind::Float32),
        FieldSpec::new("track_edge", OFFSET_V_TRACK_EDGE, FieldKind::Float32),
        FieldSpec::new("best_sector1", OFFSET_V_BEST_SECTOR1, FieldKind::Float32),
        FieldSpec::new("best_sector2", OFFSET_V_BEST_SECTOR2, FieldKind::Float32),
        FieldSpec::new("best_lap_time", OFFSET_V_BEST_LAP_TIME, FieldKind::Float32),
        FieldSpec::new("last_sector1", OFFSET_V_LAST_SECTOR1, FieldKind::Float32),
        FieldSpec::new("last_sector2", OFFSET_V_LAST_SECTOR2, FieldKind::Float32),
        FieldSpec::new("last_lap_time", OFFSET_V_LAST_LAP_TIME, FieldKind::Float32),
        FieldSpec::new("cur_sector1", OFFSET_V_CUR_SECTOR1, FieldKind::Float32),
        FieldSpec::new("cur_sector2", OFFSET_V_CUR_SECTOR2, FieldKind::Float32),
        FieldSpec::new("num_pitstops", OFFSET_V_NUM_PITSTOPS, FieldKind::Int32),
        FieldSpec::new("num_penalties", OFFSET_V_NUM_PENALTIES, FieldKind::Int32),
        FieldSpec::new("is_player", OFFSET_V_IS_PLAYER, FieldKind::Bool),
        FieldSpec::new("control", OFFSET_V_CONTROL, FieldKind::Byte),
        FieldSpec::new("in_pits", OFFSET_V_IN_PITS, FieldKind::Bool),
        FieldSpec::new("place", OFFSET_V_PLACE, FieldKind::Byte),
        FieldSpec::new("vehicle_class", OFFSET_V_VEHICLE_CLASS, FieldKind::Bytes(VEHICLE_CLASS_LEN)),
        FieldSpec::new("time_behind_next", OFFSET_V_TIME_BEHIND_NEXT, FieldKind::Float32),
        FieldSpec::new("laps_behind_next", OFFSET_V_LAPS_BEHIND_NEXT, FieldKind::Int32),
        FieldSpec::new("time_behind_leader", OFFSET_V_TIME_BEHIND_LEADER, FieldKind::Float32),
        FieldSpec::new("laps_behind_leader", OFFSET_V_LAPS_BEHIND_LEADER, FieldKind::Int32),
        FieldSpec::new("lap_start_et", OFFSET_V_LAP_START_ET, FieldKind::Float32),
        FieldSpec::new("pos", OFFSET_V_POS, FieldKind::Vector3),
        FieldSpec::new("local_vel", OFFSET_V_LOCAL_VEL, FieldKind::Vector3),
        FieldSpec::new("local_accel", OFFSET_V_LOCAL_ACCEL, FieldKind::Vector3),
        FieldSpec::new("ori_x", OFFSET_V_ORI, FieldKind::Vector3),
        FieldSpec::new("ori_y", OFFSET_V_ORI + SIZE_VECTOR3, FieldKind::Vector3),
        FieldSpec::new("ori_z", OFFSET_V_ORI + 2 * SIZE_VECTOR3, FieldKind::Vector3),
    ];
}

impl Capsule<VehicleScoring> {
    pub fn driver_name(&self) -> String {
        self.get_string(OFFSET_V_DRIVER_NAME, DRIVER_NAME_LEN)
    }

    pub fn vehicle_name(&self) -> String {
        self.get_string(OFFSET_V_VEHICLE_NAME, VEHICLE_NAME_LEN)
    }

    pub fn vehicle_class(&self) -> String {
        self.get_string(OFFSET_V_VEHICLE_CLASS, VEHICLE_CLASS_LEN)
    }

    pub fn total_laps(&self) -> i32 {
        self.get_i32(OFFSET_V_TOTAL_LAPS)
    }

    /// 0 = sector 3, 1 = sector 1, 2 = sector 2
    pub fn sector(&self) -> u8 {
        self.get_u8(OFFSET_V_SECTOR)
    }

    pub fn finish_status(&self) -> u8 {
        self.get_u8(OFFSET_V_FINISH_STATUS)
    }

    /// Distance around the current lap in meters.
    pub fn lap_dist(&self) -> f32 {
        self.get_f32(OFFSET_V_LAP_DIST)
    }

    pub fn path_lateral(&self) -> f32 {
        self.get_f32(OFFSET_V_PATH_LATERAL)
    }

    pub fn track_edge(&self) -> f32 {
        self.get_f32(OFFSET_V_TRACK_EDGE)
    }

    /// Best (sector 1, cumulative sector 2, lap) times.
    pub fn best_times(&self) -> (f32, f32, f32) {
        (
            self.get_f32(OFFSET_V_BEST_SECTOR1),
            self.get_f32(OFFSET_V_BEST_SECTOR2),
            self.get_f32(OFFSET_V_BEST_LAP_TIME),
        )
    }

    /// Last (sector 1, cumulative sector 2, lap) times.
    pub fn last_times(&self) -> (f32, f32, f32) {
        (
            self.get_f32(OFFSET_V_LAST_SECTOR1),
            self.get_f32(OFFSET_V_LAST_SECTOR2),
            self.get_f32(OFFSET_V_LAST_LAP_TIME),
        )
    }

    pub fn best_lap_time(&self) -> f32 {
        self.get_f32(OFFSET_V_BEST_LAP_TIME)
    }

    pub fn last_lap_time(&self) -> f32 {
        self.get_f32(OFFSET_V_LAST_LAP_TIME)
    }

    /// Current lap (sector 1, cumulative sector 2) times.
    pub fn current_sectors(&self) -> (f32, f32) {
        (self.get_f32(OFFSET_V_CUR_SECTOR1), self.get_f32(OFFSET_V_CUR_SECTOR2))
    }

    pub fn num_pitstops(&self) -> i32 {
        self.get_i32(OFFSET_V_NUM_PITSTOPS)
    }

    pub fn num_penalties(&self) -> i32 {
        self.get_i32(OFFSET_V_NUM_PENALTIES)
    }

    pub fn is_player(&self) -> bool {
        self.get_bool(OFFSET_V_IS_PLAYER)
    }

    /// Who is in control: -1 nobody, 0 local player, 1 local AI, 2 remote, 3 replay.
    pub fn control(&self) -> i8 {
        self.get_u8(OFFSET_V_CONTROL) as i8
    }

    pub fn in_pits(&self) -> bool {
        self.get_bool(OFFSET_V_IN_PITS)
    }

    /// 1-based classification.
    pub fn place(&self) -> u8 {
        self.get_u8(OFFSET_V_PLACE)
    }

    pub fn time_behind_next(&self) -> f32 {
        self.get_f32(OFFSET_V_TIME_BEHIND_NEXT)
    }

    pub fn laps_behind_next(&self) -> i32 {
        self.get_i32(OFFSET_V_LAPS_BEHIND_NEXT)
    }

    pub fn time_behind_leader(&self) -> f32 {
        self.get_f32(OFFSET_V_TIME_BEHIND_LEADER)
    }

    pub fn laps_behind_leader(&self) -> i32 {
        self.get_i32(OFFSET_V_LAPS_BEHIND_LEADER)
    }

    pub fn lap_start_et(&self) -> f32 {
        self.get_f32(OFFSET_V_LAP_START_ET)
    }

    /// World position of the vehicle.
    pub fn position(&self) -> Vector3 {
        self.get_vector3(OFFSET_V_POS)
    }

    pub fn local_velocity(&self) -> Vector3 {
        self.get_vector3(OFFSET_V_LOCAL_VEL)
    }

    pub fn local_acceleration(&self) -> Vector3 {
        self.get_vector3(OFFSET_V_LOCAL_ACCEL)
    }

    pub fn orientation(&self) -> [Vector3; 3] {
        [
            self.get_vector3(OFFSET_V_ORI),
            self.get_vector3(OFFSET_V_ORI + SIZE_VECTOR3),
            self.get_vector3(OFFSET_V_ORI + 2 * SIZE_VECTOR3),
        ]
    }

    pub fn set_driver_name(&mut self, name: &str) {
        self.put_string(OFFSET_V_DRIVER_NAME, DRIVER_NAME_LEN, name);
    }

    pub fn set_vehicle_name(&mut self, name: &str) {
        self.put_string(OFFSET_V_VEHICLE_NAME, VEHICLE_NAME_LEN, name);
    }

    pub fn set_total_laps(&mut self, laps: i32) {
        self.put_i32(OFFSET_V_TOTAL_LAPS, laps);
    }

    pub fn set_best_lap_time(&mut self, seconds: f32) {
        self.put_f32(OFFSET_V_BEST_LAP_TIME, seconds);
    }

    pub fn set_is_player(&mut self, player: bool) {
        self.put_u8(OFFSET_V_IS_PLAYER, u8::from(player));
    }

    pub fn set_control(&mut self, control: i8) {
        self.put_u8(OFFSET_V_CONTROL, control as u8);
    }

    pub fn set_place(&mut self, place: u8) {
        self.put_u8(OFFSET_V_PLACE, place);
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.put_vector3(OFFSET_V_POS, position);
    }
}
