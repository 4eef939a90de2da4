//! Three-component world vectors carried in telemetry capsules

use serde::{Deserialize, Serialize};

/// A world-space vector of three 32-bit floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(&self, other: &Vector3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean length.
    pub fn length(&self) -> f32 {
        self.distance_squared(&Self::ZERO).sqrt()
    }
}

/// Index and squared distance of the candidate closest to `origin`.
///
/// Runs in a single pass. Ties keep the first minimal candidate in iteration order.
/// Candidates at a NaN distance are skipped. Returns `None` when no candidate
/// has a comparable distance.
pub fn nearest_to<I>(origin: Vector3, candidates: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = Vector3>,
{
    let mut nearest: Option<(usize, f32)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let distance = origin.distance_squared(&candidate);
        if distance.is_nan() {
            continue;
        }
        match nearest {
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((index, distance)),
        }
    }
    nearest
}
