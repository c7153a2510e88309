//! Client for a behavior-tree robot soccer simulator.
//!
//! `websim` submits a behavior tree to the simulator over a websocket, buffers the
//! frames the server streams back and plays them into a renderer at a fixed cadence,
//! while following the server's pipeline status for the UI.
//!
//! # Architecture
//!
//! - **Session**: one task per run owns the connection; it sends the submission once
//!   the socket is open and routes every message to the frame queue and the status
//!   machine
//! - **Frame queue**: FIFO between the session and playback; arrival order is
//!   playback order
//! - **Status machine**: eight pipeline phases, each mapped to a notification, plus
//!   the enabled state of the UI controls
//! - **Playback driver**: pulls one frame per tick and stops at the end-of-stream
//!   sentinel
//!
//! ## Example
//!
//! ```rust,no_run
//! use websim::{BehaviorTree, FrameSink, SimulationClient, SimulationFrame, SimulatorConfig};
//!
//! struct Printer;
//!
//! impl FrameSink for Printer {
//!     fn render(&mut self, frame: &SimulationFrame) {
//!         println!("frame {} with {} robots", frame.frame_number, frame.robots.len());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> websim::Result<()> {
//!     let mut client = SimulationClient::new(SimulatorConfig::default())?;
//!     let tree = BehaviorTree::from_json_str(r#"{"root": "n1", "nodes": {"n1": {}}}"#)?;
//!
//!     let run = client.submit(tree, 42u64)?;
//!     let summary = run.play(&mut Printer).await?;
//!     println!("complete: {}", summary.is_complete());
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod protocol;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Run pipeline
pub mod client;
pub mod playback;
pub mod queue;
pub mod session;
pub mod status;
pub mod stream;

// Networking
pub mod transport;
pub mod transports;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use client::{EMPTY_TREE_MESSAGE, RunSummary, SimulationClient, SimulationRun};
pub use config::SimulatorConfig;
pub use playback::{FrameSink, PlaybackDriver, PlaybackOutcome};
pub use protocol::{AssignmentId, BehaviorTree, ClientMessage, ServerMessage};
pub use queue::{FrameConsumer, FrameQueue};
pub use session::SessionOutcome;
pub use status::{StatusMachine, StatusSnapshot, StatusWatcher};
pub use stream::{PlaybackState, PlaybackStream};
pub use transport::{Connector, Transport};
pub use transports::{WebSocketConnector, WebSocketTransport};
