//! Core types for simulation data.
//!
//! ## Overview
//!
//! - [`SimulationFrame`] is one timestep of robot and ball positions; frame number `-1`
//!   is reserved for the end-of-stream sentinel
//! - [`StatusPhase`] is the server-side pipeline stage, with a fixed [`StatusDisplay`]
//!   per phase
//! - [`PlaybackRate`] controls the cadence at which frames are rendered
//!
//! ## Usage Example
//!
//! ```rust
//! use websim::types::{SimulationFrame, StatusPhase};
//!
//! let frame: SimulationFrame =
//!     serde_json::from_str(r#"{"frame_number": 0, "ball": {"x": 0, "y": 0}}"#).unwrap();
//! assert!(!frame.is_sentinel());
//! assert!(frame.robots.is_empty());
//!
//! assert_eq!(StatusPhase::from_code(3), Some(StatusPhase::Queued));
//! ```

mod frame;
mod playback_rate;
mod status;

pub use frame::{BallState, RobotState, SENTINEL_FRAME_NUMBER, SimulationFrame, Team};
pub use playback_rate::{DEFAULT_PLAYBACK_FPS, PlaybackRate};
pub use status::{Notification, Severity, StatusDisplay, StatusPhase};
