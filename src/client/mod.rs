//! Simulation client: submission entry point and per-run handles

mod run;

pub use run::{RunSummary, SimulationRun};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SimulatorConfig;
use crate::protocol::{AssignmentId, BehaviorTree, ClientMessage};
use crate::queue::FrameQueue;
use crate::session::{Session, SessionContext};
use crate::status::{StatusMachine, StatusWatcher};
use crate::transport::Connector;
use crate::transports::WebSocketConnector;
use crate::types::{Notification, StatusPhase};
use crate::{Result, SimulationError};

/// Notification shown when a tree without nodes is submitted
pub const EMPTY_TREE_MESSAGE: &str = "Tree must contain at least one node.";

/// Submits behavior trees to the simulator, one run at a time
///
/// The client owns the status machine for its whole lifetime; every run gets a fresh
/// frame queue and its own session task.
pub struct SimulationClient<C: Connector = WebSocketConnector> {
    connector: Arc<C>,
    config: SimulatorConfig,
    status: Arc<StatusMachine>,
    /// Cancelled when the most recent session task has exited
    session_done: Option<CancellationToken>,
    /// Cancelled when the most recent run has been played out or dropped
    run_done: Option<CancellationToken>,
}

impl SimulationClient<WebSocketConnector> {
    /// Create a client that connects over websockets
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        let connector = WebSocketConnector::new(config.connect_timeout());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> SimulationClient<C> {
    /// Create a client with a custom connector
    pub fn with_connector(config: SimulatorConfig, connector: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connector: Arc::new(connector),
            config,
            status: Arc::new(StatusMachine::new()),
            session_done: None,
            run_done: None,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Read-only view of the status machine
    pub fn status(&self) -> StatusWatcher {
        self.status.watch()
    }

    /// Whether the previous run still owns the status machine
    ///
    /// A run stays active until its session task has exited and the run itself has
    /// been played out or dropped.
    pub fn is_busy(&self) -> bool {
        [&self.session_done, &self.run_done]
            .into_iter()
            .flatten()
            .any(|done| !done.is_cancelled())
    }

    /// Submit a tree for simulation.
    ///
    /// Fails with [`SimulationError::SessionActive`] while a previous run is still
    /// active (see [`is_busy`](Self::is_busy)), and with [`SimulationError::EmptyTree`]
    /// if the tree has no root; in the latter case no connection is opened and the
    /// status machine is finished with a warning so the controls are re-enabled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(
        &mut self,
        tree: BehaviorTree,
        assignment_id: impl Into<AssignmentId>,
    ) -> Result<SimulationRun> {
        if self.is_busy() {
            warn!("Rejecting submission while a run is active");
            return Err(SimulationError::SessionActive);
        }

        if !tree.has_root() {
            warn!("Rejecting tree without a root node");
            self.status.fail(Notification::warning(EMPTY_TREE_MESSAGE));
            return Err(SimulationError::EmptyTree);
        }

        let assignment_id = assignment_id.into();
        info!(assignment = %assignment_id, "Submitting tree");

        self.status.reset();
        self.status.transition(StatusPhase::Submitted);

        let queue = FrameQueue::new();
        let frames = queue.consumer();
        let cancel = CancellationToken::new();
        let session_done = CancellationToken::new();
        let run_done = CancellationToken::new();

        let context = SessionContext {
            queue,
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
            done: session_done.clone(),
        };
        let session = Session::spawn(
            Arc::clone(&self.connector),
            self.config.endpoint(),
            ClientMessage::simulate(tree, assignment_id),
            context,
        );
        self.session_done = Some(session_done);
        self.run_done = Some(run_done.clone());

        Ok(SimulationRun::new(
            frames,
            Arc::clone(&self.status),
            cancel,
            run_done,
            session,
            self.config.playback_rate(),
            self.config.lookahead_frames,
        ))
    }
}
