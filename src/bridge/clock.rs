//! Coarse and fine redraw cadences

use crate::config::ClockConfig;

/// Gating signals for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockSignals {
    pub coarse: bool,
    pub fine: bool,
}

impl ClockSignals {
    pub const ALL: ClockSignals = ClockSignals { coarse: true, fine: true };
}

/// Counts rendered frames since the last reconfiguration.
///
/// Both signals fire on the first frame after [`reset`](Self::reset), then
/// every `coarse_interval_frames` and `fine_interval_frames` frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    config: ClockConfig,
    frames: u64,
}

impl FrameClock {
    pub fn new(config: ClockConfig) -> Self {
        Self { config, frames: 0 }
    }

    pub fn reset(&mut self) {
        self.frames = 0;
    }

    pub fn advance(&mut self) -> ClockSignals {
        let frame = self.frames;
        self.frames += 1;
        ClockSignals {
            coarse: frame % u64::from(self.config.coarse_interval_frames.max(1)) == 0,
            fine: frame % u64::from(self.config.fine_interval_frames.max(1)) == 0,
        }
    }
}
