//! Simulation frame types

use serde::{Deserialize, Serialize};

/// Frame number reserved for the end-of-stream sentinel.
pub const SENTINEL_FRAME_NUMBER: i64 = -1;

/// Team a robot plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
}

/// Position and heading of one robot.
///
/// Coordinates are field-centred millimetres; `orientation` is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub id: u32,
    pub team: Team,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
}

/// Position of the ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f64,
    pub y: f64,
}

/// One timestep of a simulation run.
///
/// This is the unit that flows from the session through the frame queue to the
/// renderer. Frames are shared as `Arc<SimulationFrame>` once enqueued and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFrame {
    /// Server-assigned frame counter, `-1` for the sentinel
    pub frame_number: i64,

    /// Robots visible this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub robots: Vec<RobotState>,

    /// Ball, if tracked this frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<BallState>,
}

impl SimulationFrame {
    /// Create an empty frame with the given number
    pub fn new(frame_number: i64) -> Self {
        Self { frame_number, robots: Vec::new(), ball: None }
    }

    /// The end-of-stream marker
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_FRAME_NUMBER)
    }

    pub fn is_sentinel(&self) -> bool {
        self.frame_number == SENTINEL_FRAME_NUMBER
    }

    pub fn with_ball(mut self, x: f64, y: f64) -> Self {
        self.ball = Some(BallState { x, y });
        self
    }

    pub fn with_robot(mut self, robot: RobotState) -> Self {
        self.robots.push(robot);
        self
    }
}
