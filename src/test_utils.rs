//! Test utilities: scripted transports, message builders and a recording sink
//!
//! Compiled for unit tests and for the `benchmark` feature so benches can build
//! realistic server messages.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;

use crate::playback::FrameSink;
use crate::protocol::BehaviorTree;
use crate::transport::{Connector, Transport};
use crate::types::SimulationFrame;
use crate::{Result, SimulationError};

/// One scripted server action
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver a text message
    Send(String),
    /// Pause before the next step
    Wait(Duration),
    /// Close the connection from the server side
    Close,
    /// Fail with a transport error
    Fail(String),
    /// Panic inside the session task
    Panic,
}

/// What the client did to the scripted transport
#[derive(Debug, Default)]
pub struct TransportLog {
    connects: AtomicUsize,
    closes: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl TransportLog {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Messages the client sent, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Connector that hands out a transport replaying a fixed script
///
/// Once the script is exhausted the connection stays open and silent.
pub struct ScriptedConnector {
    script: Mutex<VecDeque<ScriptStep>>,
    log: Arc<TransportLog>,
    refuse: bool,
}

impl ScriptedConnector {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            log: Arc::new(TransportLog::default()),
            refuse: false,
        }
    }

    /// A connector whose every connection attempt fails
    pub fn refusing() -> Self {
        Self { refuse: true, ..Self::new(Vec::<ScriptStep>::new()) }
    }

    pub fn log(&self) -> Arc<TransportLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, endpoint: &str) -> Result<Self::Transport> {
        if self.refuse {
            return Err(SimulationError::connection_failed(format!(
                "connection refused by {endpoint}"
            )));
        }
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        let steps = std::mem::take(&mut *self.script.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(ScriptedTransport { steps, log: Arc::clone(&self.log), closed: false })
    }
}

/// Transport produced by [`ScriptedConnector`]
pub struct ScriptedTransport {
    steps: VecDeque<ScriptStep>,
    log: Arc<TransportLog>,
    closed: bool,
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(SimulationError::connection_failed("send on closed transport"));
        }
        self.log.sent.lock().unwrap_or_else(PoisonError::into_inner).push(text);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            if self.closed {
                return Ok(None);
            }
            match self.steps.pop_front() {
                Some(ScriptStep::Send(text)) => return Ok(Some(text)),
                Some(ScriptStep::Wait(duration)) => tokio::time::sleep(duration).await,
                Some(ScriptStep::Close) => {
                    self.closed = true;
                    return Ok(None);
                }
                Some(ScriptStep::Fail(reason)) => {
                    return Err(SimulationError::connection_failed(reason));
                }
                Some(ScriptStep::Panic) => panic!("scripted transport panic"),
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Renderer stand-in that records what it was given
#[derive(Debug, Default)]
pub struct FrameRecorder {
    pub frames: Vec<SimulationFrame>,
    pub completions: usize,
}

impl FrameRecorder {
    pub fn frame_numbers(&self) -> Vec<i64> {
        self.frames.iter().map(|f| f.frame_number).collect()
    }
}

impl FrameSink for FrameRecorder {
    fn render(&mut self, frame: &SimulationFrame) {
        self.frames.push(frame.clone());
    }

    fn complete(&mut self) {
        self.completions += 1;
    }
}

/// `{"body":{"simulator_status":code}}`
pub fn status_message(code: i64) -> String {
    json!({ "body": { "simulator_status": code } }).to_string()
}

/// `{"body":{"simulator_output":[...]}}` with one ball-only frame per number
pub fn frames_message(numbers: &[i64]) -> String {
    let frames: Vec<_> =
        numbers.iter().map(|n| json!({ "frame_number": n, "ball": { "x": 0, "y": 0 } })).collect();
    json!({ "body": { "simulator_output": frames } }).to_string()
}

/// A server message with `count` fully populated frames (eleven robots per team)
pub fn frame_batch_message(count: usize) -> String {
    let frames: Vec<_> = (0..count)
        .map(|n| {
            let robots: Vec<_> = (0..22)
                .map(|id| {
                    json!({
                        "id": id % 11,
                        "team": if id < 11 { "A" } else { "B" },
                        "x": (id as f64) * 150.0 - 1500.0,
                        "y": (n as f64) * 2.5,
                        "orientation": 0.1 * id as f64,
                    })
                })
                .collect();
            json!({ "frame_number": n, "robots": robots, "ball": { "x": n, "y": -(n as i64) } })
        })
        .collect();
    json!({ "body": { "simulator_output": frames, "simulator_status": 6 } }).to_string()
}

/// Single-node tree as exported by the editor
pub fn sample_tree() -> BehaviorTree {
    BehaviorTree::from_value(json!({
        "root": "n1",
        "nodes": {
            "n1": {
                "id": "n1",
                "name": "GoToPos",
                "title": "GoToPos_A",
                "properties": { "xGoal": 1, "yGoal": 1 }
            }
        }
    }))
}
