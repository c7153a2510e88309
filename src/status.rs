//! Status machine for the server-side simulation pipeline
//!
//! The machine trusts the server: [`StatusMachine::transition`] applies any phase at
//! any time. Each applied phase is published on a watch channel as a
//! [`StatusSnapshot`], so any number of read-only [`StatusWatcher`]s can follow it.

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::types::{Notification, StatusDisplay, StatusPhase};

/// Published state of the status machine.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Current phase
    pub phase: StatusPhase,

    /// What the status overlay shows
    pub display: StatusDisplay,

    /// Whether run/load/save/auth controls should be usable
    pub controls_enabled: bool,

    /// Incremented on every applied transition, including repeats of the same phase
    pub revision: u64,
}

impl StatusSnapshot {
    fn initial() -> Self {
        Self {
            phase: StatusPhase::Ready,
            display: StatusPhase::Ready.display(),
            controls_enabled: true,
            revision: 0,
        }
    }
}

/// Finite-state model of the simulation pipeline.
///
/// Re-entrant: [`reset`](Self::reset) returns it to `Ready` for the next submission.
#[derive(Debug)]
pub struct StatusMachine {
    tx: watch::Sender<StatusSnapshot>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StatusSnapshot::initial());
        Self { tx }
    }

    /// Apply `phase` and publish its display effect.
    ///
    /// Entering `Submitted` disables the controls, entering `Finished` re-enables them.
    pub fn transition(&self, phase: StatusPhase) -> StatusDisplay {
        self.apply(phase, phase.display())
    }

    /// Finish the run with a caller-supplied notification instead of the default
    /// "finished" message. Used for rejected submissions and transport failures.
    pub fn fail(&self, notification: Notification) -> StatusDisplay {
        self.apply(StatusPhase::Finished, StatusDisplay::Show(notification))
    }

    /// Return to `Ready` with controls enabled.
    pub fn reset(&self) {
        self.tx.send_modify(|snapshot| {
            snapshot.phase = StatusPhase::Ready;
            snapshot.display = StatusPhase::Ready.display();
            snapshot.controls_enabled = true;
            snapshot.revision += 1;
        });
    }

    fn apply(&self, phase: StatusPhase, display: StatusDisplay) -> StatusDisplay {
        let published = display.clone();
        self.tx.send_modify(|snapshot| {
            debug!(from = %snapshot.phase, to = %phase, "Status transition");
            snapshot.phase = phase;
            snapshot.display = display;
            match phase {
                StatusPhase::Submitted => snapshot.controls_enabled = false,
                StatusPhase::Finished => snapshot.controls_enabled = true,
                _ => {}
            }
            snapshot.revision += 1;
        });
        published
    }

    pub fn phase(&self) -> StatusPhase {
        self.tx.borrow().phase
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Create a read-only view of the machine.
    pub fn watch(&self) -> StatusWatcher {
        StatusWatcher { rx: self.tx.subscribe() }
    }
}

/// Read-only view of a [`StatusMachine`].
#[derive(Debug, Clone)]
pub struct StatusWatcher {
    rx: watch::Receiver<StatusSnapshot>,
}

impl StatusWatcher {
    /// Latest published snapshot
    pub fn current(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once the machine has been dropped.
    pub async fn changed(&mut self) -> Option<StatusSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream of snapshots, starting with the current one.
    ///
    /// Rapid transitions may be coalesced; use [`StatusSnapshot::revision`] to detect
    /// skipped deliveries.
    pub fn into_stream(self) -> BoxStream<'static, StatusSnapshot> {
        WatchStream::new(self.rx).boxed()
    }
}
