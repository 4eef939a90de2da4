//! Graphics info record: camera placement and ambient lighting

use crate::capsule::codec::{SIZE_DOUBLE, SIZE_LONG, SIZE_VECTOR3};
use crate::capsule::{Capsule, CapsuleLayout, FieldKind, FieldSpec, Vector3};

const OFFSET_CAM_POS: usize = 0;
const OFFSET_CAM_ORI: usize = OFFSET_CAM_POS + SIZE_VECTOR3;
const OFFSET_WINDOW_HANDLE: usize = OFFSET_CAM_ORI + 3 * SIZE_VECTOR3;
const OFFSET_AMBIENT_RED: usize = OFFSET_WINDOW_HANDLE + SIZE_LONG;
const OFFSET_AMBIENT_GREEN: usize = OFFSET_AMBIENT_RED + SIZE_DOUBLE;
const OFFSET_AMBIENT_BLUE: usize = OFFSET_AMBIENT_GREEN + SIZE_DOUBLE;

const BUFFER_SIZE: usize = OFFSET_AMBIENT_BLUE + SIZE_DOUBLE;

const _: () = assert!(BUFFER_SIZE == 80);

/// Camera and lighting state for the current frame.
pub struct GraphicsInfo;

pub type GraphicsInfoCapsule = Capsule<GraphicsInfo>;

impl CapsuleLayout for GraphicsInfo {
    const NAME: &'static str = "GraphicsInfo";
    const BUFFER_SIZE: usize = BUFFER_SIZE;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("cam_pos", OFFSET_CAM_POS, FieldKind::Vector3),
        FieldSpec::new("cam_ori_x", OFFSET_CAM_ORI, FieldKind::Vector3),
        FieldSpec::new("cam_ori_y", OFFSET_CAM_ORI + SIZE_VECTOR3, FieldKind::Vector3),
        FieldSpec::new("cam_ori_z", OFFSET_CAM_ORI + 2 * SIZE_VECTOR3, FieldKind::Vector3),
        FieldSpec::new("window_handle", OFFSET_WINDOW_HANDLE, FieldKind::Int64),
        FieldSpec::new("ambient_red", OFFSET_AMBIENT_RED, FieldKind::Float64),
        FieldSpec::new("ambient_green", OFFSET_AMBIENT_GREEN, FieldKind::Float64),
        FieldSpec::new("ambient_blue", OFFSET_AMBIENT_BLUE, FieldKind::Float64),
    ];
}

impl Capsule<GraphicsInfo> {
    /// Camera position in world coordinates.
    pub fn camera_position(&self) -> Vector3 {
        self.get_vector3(OFFSET_CAM_POS)
    }

    /// Camera orientation matrix rows (x, y, z).
    pub fn camera_orientation(&self) -> [Vector3; 3] {
        [
            self.get_vector3(OFFSET_CAM_ORI),
            self.get_vector3(OFFSET_CAM_ORI + SIZE_VECTOR3),
            self.get_vector3(OFFSET_CAM_ORI + 2 * SIZE_VECTOR3),
        ]
    }

    /// Native window handle of the game window.
    pub fn window_handle(&self) -> i64 {
        self.get_i64(OFFSET_WINDOW_HANDLE)
    }

    /// Ambient light color as (red, green, blue).
    pub fn ambient_color(&self) -> (f64, f64, f64) {
        (
            self.get_f64(OFFSET_AMBIENT_RED),
            self.get_f64(OFFSET_AMBIENT_GREEN),
            self.get_f64(OFFSET_AMBIENT_BLUE),
        )
    }

    pub fn set_camera_position(&mut self, position: Vector3) {
        self.put_vector3(OFFSET_CAM_POS, position);
    }

    pub fn set_camera_orientation(&mut self, rows: [Vector3; 3]) {
        for (i, row) in rows.into_iter().enumerate() {
            self.put_vector3(OFFSET_CAM_ORI + i * SIZE_VECTOR3, row);
        }
    }

    pub fn set_window_handle(&mut self, handle: i64) {
        self.put_i64(OFFSET_WINDOW_HANDLE, handle);
    }

    pub fn set_ambient_color(&mut self, red: f64, green: f64, blue: f64) {
        self.put_f64(OFFSET_AMBIENT_RED, red);
        self.put_f64(OFFSET_AMBIENT_GREEN, green);
        self.put_f64(OFFSET_AMBIENT_BLUE, blue);
    }
}
