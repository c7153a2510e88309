//! Playback cadence control

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cadence, matching the simulator's native frame rate.
pub const DEFAULT_PLAYBACK_FPS: u32 = 60;

/// Rate at which buffered frames are handed to the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackRate {
    /// Same rate the simulator produced the frames at
    #[default]
    Native,

    /// Fixed number of frames per second
    /// A value of zero is treated as one frame per second
    Fps(u32),
}

impl PlaybackRate {
    /// Effective frames per second
    pub fn frames_per_second(self) -> u32 {
        match self {
            PlaybackRate::Native => DEFAULT_PLAYBACK_FPS,
            PlaybackRate::Fps(fps) => fps.max(1),
        }
    }

    /// Tick interval between two rendered frames
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frames_per_second() as f64)
    }
}
