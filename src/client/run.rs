//! Handle for one submitted simulation

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::playback::{FrameSink, PlaybackDriver, PlaybackOutcome};
use crate::queue::FrameConsumer;
use crate::session::{CANCELLED_MESSAGE, SessionOutcome};
use crate::status::{StatusMachine, StatusWatcher};
use crate::stream::PlaybackState;
use crate::types::{Notification, PlaybackRate, StatusPhase};
use crate::{Result, SimulationError};

/// How a run ended, from both the network and the playback side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub session: SessionOutcome,
    pub playback: PlaybackOutcome,
}

impl RunSummary {
    /// Server finished and every frame was played
    pub fn is_complete(&self) -> bool {
        self.session.is_completed() && self.playback.is_complete()
    }
}

/// Owns the end of a run's claim on the shared status machine.
///
/// Until it is settled the run counts as active. Dropping it unsettled closes the
/// connection and finishes the machine as cancelled, so the controls never stay
/// disabled.
struct RunGuard {
    status: Arc<StatusMachine>,
    cancel: CancellationToken,
    done: CancellationToken,
    settled: bool,
}

impl RunGuard {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        // An abandoned or cancelled session has already published its final status
        if !self.settled && !self.status.phase().is_terminal() {
            debug!("Run dropped before it was played out");
            self.status.fail(Notification::warning(CANCELLED_MESSAGE));
        }
        self.done.cancel();
    }
}

/// One in-flight simulation run
///
/// Dropping the run closes its connection. The client accepts a new submission only
/// once the run has been played out or dropped and its session task has exited.
pub struct SimulationRun {
    frames: FrameConsumer,
    status: Arc<StatusMachine>,
    cancel: CancellationToken,
    session: JoinHandle<SessionOutcome>,
    rate: PlaybackRate,
    lookahead: usize,
    guard: RunGuard,
}

impl SimulationRun {
    pub(crate) fn new(
        frames: FrameConsumer,
        status: Arc<StatusMachine>,
        cancel: CancellationToken,
        done: CancellationToken,
        session: JoinHandle<SessionOutcome>,
        rate: PlaybackRate,
        lookahead: usize,
    ) -> Self {
        let guard = RunGuard {
            status: Arc::clone(&status),
            cancel: cancel.clone(),
            done,
            settled: false,
        };
        Self { frames, status, cancel, session, rate, lookahead, guard }
    }

    /// Read-only view of the status machine
    pub fn status(&self) -> StatusWatcher {
        self.status.watch()
    }

    /// Frames received but not yet played
    pub fn buffered_frames(&self) -> usize {
        self.frames.len()
    }

    /// Close the connection and stop playback
    pub fn cancel(&self) {
        debug!("Run cancelled by client");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this run, for use from another task while
    /// [`play`](Self::play) holds the run
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Play the run into `sink` until the stream completes or the run is abandoned.
    ///
    /// After the last frame of a completed run the status machine is moved to
    /// `Finished`, which re-enables the controls. A run cancelled after the server
    /// finished is reported as cancelled instead.
    pub async fn play<S>(self, sink: &mut S) -> Result<RunSummary>
    where
        S: FrameSink + ?Sized,
    {
        self.play_observed(sink, |_| {}).await
    }

    /// Like [`play`](Self::play), handing the playback state receiver to `observe`
    /// before the first frame.
    pub async fn play_observed<S, F>(self, sink: &mut S, observe: F) -> Result<RunSummary>
    where
        S: FrameSink + ?Sized,
        F: FnOnce(watch::Receiver<PlaybackState>),
    {
        let Self { frames, status, cancel, mut session, rate, lookahead, guard } = self;

        let driver = PlaybackDriver::new(frames, rate, lookahead);
        observe(driver.subscribe_state());

        let playback = driver.run(sink, &cancel);
        tokio::pin!(playback);

        // The session writes its last status before exiting, so both halves are awaited
        // before publishing the final phase
        let (playback, joined) = tokio::select! {
            playback = &mut playback => (playback, (&mut session).await),
            joined = &mut session => {
                // A session that died without a final status leaves nothing to wait for
                if joined.is_err() {
                    cancel.cancel();
                }
                (playback.await, joined)
            }
        };

        let session = match joined {
            Ok(session) => session,
            Err(e) => {
                error!("Session task failed: {}", e);
                let error = SimulationError::from(e);
                status.fail(Notification::warning(format!("Simulation failed: {error}")));
                guard.settle();
                return Err(error);
            }
        };

        match (&session, playback.is_complete()) {
            (SessionOutcome::Completed { .. }, true) => {
                status.transition(StatusPhase::Finished);
            }
            // Server finished but the remaining frames were never played
            (SessionOutcome::Completed { .. }, false) => {
                status.fail(Notification::warning(CANCELLED_MESSAGE));
            }
            // Abandoned and cancelled sessions publish their own final status
            _ => {}
        }
        guard.settle();

        info!(
            frames_received = session.frames_received(),
            frames_played = playback.frames_played(),
            "Run ended"
        );
        Ok(RunSummary { session, playback })
    }
}
