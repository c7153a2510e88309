//! Session task that owns the simulator connection for one run

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::queue::FrameQueue;
use crate::status::StatusMachine;
use crate::transport::{Connector, Transport};
use crate::types::{Notification, StatusPhase};
use crate::SimulationError;

/// Notification shown when a run is cancelled by the client
pub(crate) const CANCELLED_MESSAGE: &str = "Simulation cancelled.";

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server reported `Finished`; the sentinel was enqueued and the connection closed
    Completed { frames_received: u64 },

    /// The connection failed or closed before the server finished
    Abandoned { frames_received: u64, reason: String },

    /// The client cancelled the run
    Cancelled { frames_received: u64 },
}

impl SessionOutcome {
    pub fn frames_received(&self) -> u64 {
        match self {
            SessionOutcome::Completed { frames_received }
            | SessionOutcome::Abandoned { frames_received, .. }
            | SessionOutcome::Cancelled { frames_received } => *frames_received,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }
}

/// Handles owned by a session for the duration of one run
pub struct SessionContext {
    /// Producer half of the run's frame queue
    pub queue: FrameQueue,
    /// Status machine the session reports phases to
    pub status: Arc<StatusMachine>,
    /// Cancelled by the client to abort, and by the session when the run is abandoned
    pub cancel: CancellationToken,
    /// Cancelled when the session task exits, however it exits
    pub done: CancellationToken,
}

enum Routing {
    Continue,
    Finished,
    Rejected(SimulationError),
}

/// Spawns and runs session tasks
///
/// The session task is the only writer of the run's frame queue and status machine
/// while the connection is alive.
pub struct Session;

impl Session {
    /// Spawn a session task that connects to `endpoint` and submits `submission`
    pub fn spawn<C>(
        connector: Arc<C>,
        endpoint: String,
        submission: ClientMessage,
        context: SessionContext,
    ) -> JoinHandle<SessionOutcome>
    where
        C: Connector,
    {
        tokio::spawn(async move {
            let _done = context.done.clone().drop_guard();
            Self::session_task(connector.as_ref(), &endpoint, submission, &context).await
        })
    }

    async fn session_task<C>(
        connector: &C,
        endpoint: &str,
        submission: ClientMessage,
        context: &SessionContext,
    ) -> SessionOutcome
    where
        C: Connector,
    {
        info!("Session started for {}", endpoint);

        let payload = match submission.to_json() {
            Ok(payload) => payload,
            Err(e) => return Self::abandon(context, 0, e),
        };

        let connected = tokio::select! {
            biased;
            _ = context.cancel.cancelled() => {
                info!("Session cancelled before the connection opened");
                return Self::cancelled(context, 0);
            }
            result = connector.connect(endpoint) => result,
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to connect to simulator: {}", e);
                return Self::abandon(context, 0, e);
            }
        };

        // The connector only resolves once the socket is open
        if let Err(e) = transport.send_text(payload).await {
            error!("Failed to send submission: {}", e);
            Self::close_quietly(&mut transport).await;
            return Self::abandon(context, 0, e);
        }
        debug!("Submission sent");

        let mut frames_received = 0u64;
        loop {
            let message = tokio::select! {
                biased;
                _ = context.cancel.cancelled() => {
                    info!("Session cancelled after {} frames", frames_received);
                    Self::close_quietly(&mut transport).await;
                    return Self::cancelled(context, frames_received);
                }
                message = transport.next_message() => message,
            };

            match message {
                Ok(Some(text)) => match Self::route(&text, context, &mut frames_received) {
                    Routing::Continue => {}
                    Routing::Finished => {
                        Self::close_quietly(&mut transport).await;
                        // Hide the overlay while the remaining frames play out
                        context.status.transition(StatusPhase::Simulating);
                        info!("Simulation finished after {} frames", frames_received);
                        return SessionOutcome::Completed { frames_received };
                    }
                    Routing::Rejected(e) => {
                        warn!("Simulator rejected submission: {}", e);
                        Self::close_quietly(&mut transport).await;
                        return Self::abandon(context, frames_received, e);
                    }
                },
                Ok(None) => {
                    warn!("Connection closed before the simulation finished");
                    return Self::abandon(
                        context,
                        frames_received,
                        SimulationError::connection_failed("connection closed by server"),
                    );
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    return Self::abandon(context, frames_received, e);
                }
            }
        }
    }

    /// Apply one server message to the queue and the status machine
    fn route(text: &str, context: &SessionContext, frames_received: &mut u64) -> Routing {
        let update = match ServerMessage::decode(text) {
            Ok(ServerMessage::Update(update)) => update,
            Ok(ServerMessage::ProtocolError { code, details }) => {
                return Routing::Rejected(SimulationError::Rejected { code, details });
            }
            Err(e) => {
                warn!("Ignoring undecodable message: {}", e);
                return Routing::Continue;
            }
        };

        if update.is_empty() {
            trace!("Ignoring message without frames or status");
            return Routing::Continue;
        }

        if !update.frames.is_empty() {
            trace!("Enqueueing {} frames", update.frames.len());
            *frames_received += update.frames.len() as u64;
            context.queue.enqueue_all(update.frames);
        }

        match update.status {
            Some(StatusPhase::Finished) => {
                context.queue.seal();
                Routing::Finished
            }
            Some(phase) => {
                debug!("Server status {}", phase);
                context.status.transition(phase);
                Routing::Continue
            }
            None => Routing::Continue,
        }
    }

    async fn close_quietly<T: Transport>(transport: &mut T) {
        if let Err(e) = transport.close().await {
            debug!("Error while closing connection: {}", e);
        }
    }

    fn abandon(
        context: &SessionContext,
        frames_received: u64,
        error: SimulationError,
    ) -> SessionOutcome {
        context.status.fail(Notification::warning(format!("Simulation failed: {error}")));
        context.cancel.cancel();
        SessionOutcome::Abandoned { frames_received, reason: error.to_string() }
    }

    fn cancelled(context: &SessionContext, frames_received: u64) -> SessionOutcome {
        context.status.fail(Notification::warning(CANCELLED_MESSAGE));
        SessionOutcome::Cancelled { frames_received }
    }
}

