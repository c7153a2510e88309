//! Websocket message formats exchanged with the simulator.
//!
//! Outbound, the client sends a single submission:
//!
//! ```json
//! {"action": "SIM", "values": {"tree": {...}, "assignment_id": 42}}
//! ```
//!
//! Inbound, the server wraps every update in a `body` envelope. Both fields are
//! optional and independent:
//!
//! ```json
//! {"body": {"simulator_output": [{"frame_number": 0}], "simulator_status": 3}}
//! ```
//!
//! An invalid submission is answered with `{"code": 3000, "errors": {...}}` instead,
//! after which the server closes the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::{SimulationFrame, StatusPhase};
use crate::{Result, SimulationError};

/// Behavior tree document as exported by the tree editor.
///
/// The tree is opaque to this crate apart from its `root` field, which must name a
/// node for the tree to be simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorTree(Value);

impl BehaviorTree {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parse an exported tree document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map(Self)
            .map_err(|e| SimulationError::parse_error("behavior tree", e.to_string()))
    }

    /// The root node reference, if the tree has one.
    ///
    /// `null`, an empty string and a missing field all count as "no root".
    pub fn root(&self) -> Option<&Value> {
        match self.0.get("root")? {
            Value::Null => None,
            Value::String(id) if id.is_empty() => None,
            root => Some(root),
        }
    }

    pub fn has_root(&self) -> bool {
        self.root().is_some()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Identifier of the assignment a tree is submitted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignmentId {
    Number(u64),
    Text(String),
}

impl From<u64> for AssignmentId {
    fn from(id: u64) -> Self {
        AssignmentId::Number(id)
    }
}

impl From<&str> for AssignmentId {
    fn from(id: &str) -> Self {
        AssignmentId::Text(id.to_string())
    }
}

impl From<String> for AssignmentId {
    fn from(id: String) -> Self {
        AssignmentId::Text(id)
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentId::Number(id) => write!(f, "{id}"),
            AssignmentId::Text(id) => f.write_str(id),
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "values")]
pub enum ClientMessage {
    #[serde(rename = "SIM")]
    Simulate { tree: BehaviorTree, assignment_id: AssignmentId },
}

impl ClientMessage {
    pub fn simulate(tree: BehaviorTree, assignment_id: AssignmentId) -> Self {
        ClientMessage::Simulate { tree, assignment_id }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| SimulationError::parse_error("submission payload", e.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawServerMessage {
    #[serde(default)]
    body: Option<RawBody>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBody {
    #[serde(default)]
    simulator_output: Option<Vec<Value>>,
    #[serde(default)]
    simulator_status: Option<i64>,
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Frames and/or a status update; either may be empty
    Update(ServerUpdate),

    /// The server refused the submission and is closing the connection
    ProtocolError { code: u16, details: String },
}

/// Frame and status content of one server message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerUpdate {
    /// Accepted frames in message order
    pub frames: Vec<SimulationFrame>,

    /// Number of frame entries that were malformed or used the reserved number
    pub rejected_frames: usize,

    /// Reported phase, if the message carried a known status code
    pub status: Option<StatusPhase>,
}

impl ServerUpdate {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.status.is_none()
    }
}

impl ServerMessage {
    /// Decode one text message from the server.
    ///
    /// Malformed frame entries are dropped individually, so one bad entry does not
    /// discard the rest of the batch. Unknown status codes are dropped as well.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: RawServerMessage = serde_json::from_str(text)
            .map_err(|e| SimulationError::parse_error("server message", e.to_string()))?;

        if let Some(code) = raw.code {
            let details = raw.errors.map(|errors| errors.to_string()).unwrap_or_default();
            return Ok(ServerMessage::ProtocolError { code, details });
        }

        let mut update = ServerUpdate::default();
        let Some(body) = raw.body else {
            return Ok(ServerMessage::Update(update));
        };

        for entry in body.simulator_output.unwrap_or_default() {
            match serde_json::from_value::<SimulationFrame>(entry) {
                Ok(frame) if frame.is_sentinel() => {
                    warn!("Dropping server frame that uses the reserved sentinel number");
                    update.rejected_frames += 1;
                }
                Ok(frame) => update.frames.push(frame),
                Err(e) => {
                    warn!("Dropping malformed frame: {}", e);
                    update.rejected_frames += 1;
                }
            }
        }

        if let Some(code) = body.simulator_status {
            update.status = StatusPhase::from_code(code);
            if update.status.is_none() {
                warn!("Ignoring unknown simulator status code {}", code);
            }
        }

        Ok(ServerMessage::Update(update))
    }
}
