//! Paced frame stream over a frame queue

use futures::{Stream, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::queue::FrameConsumer;
use crate::types::{PlaybackRate, SimulationFrame};

/// Where playback currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for the look-ahead buffer to fill before the first frame
    Prebuffering,
    /// Handing out one frame per tick
    Playing,
    /// Ran dry before the sentinel; waiting for the buffer to fill again
    Buffering,
    /// Sentinel reached
    Complete,
}

/// Stream that yields one buffered frame per tick and ends at the sentinel
///
/// The queue is polled, never awaited: on a tick with nothing to play the stream
/// simply waits for the next tick. Buffering is not an error.
pub struct PlaybackStream {
    consumer: FrameConsumer,
    interval: Interval,
    lookahead: usize,
    state: PlaybackState,
    state_tx: watch::Sender<PlaybackState>,
}

impl PlaybackStream {
    /// Create a stream over `consumer`
    ///
    /// Playback starts (and resumes after running dry) once `lookahead` frames are
    /// buffered or the sentinel has been enqueued.
    pub fn new(consumer: FrameConsumer, rate: PlaybackRate, lookahead: usize) -> Self {
        let mut interval = interval(rate.interval());
        // Set missed tick behavior to delay (don't burst)
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (state_tx, _) = watch::channel(PlaybackState::Prebuffering);
        Self { consumer, interval, lookahead, state: PlaybackState::Prebuffering, state_tx }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Follow state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, buffered = self.consumer.len(), "Playback state");
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn buffer_ready(&self) -> bool {
        self.consumer.is_sealed() || self.consumer.len() >= self.lookahead.max(1)
    }

    /// Take the frame to show this tick, if any
    fn take_frame(&mut self) -> Option<Arc<SimulationFrame>> {
        if matches!(self.state, PlaybackState::Prebuffering | PlaybackState::Buffering) {
            if !self.buffer_ready() {
                return None;
            }
            self.set_state(PlaybackState::Playing);
        }

        match self.consumer.dequeue() {
            Some(frame) if frame.is_sentinel() => {
                self.set_state(PlaybackState::Complete);
                None
            }
            Some(frame) => {
                trace!("Playing frame {}", frame.frame_number);
                Some(frame)
            }
            None => {
                self.set_state(PlaybackState::Buffering);
                None
            }
        }
    }
}

impl Stream for PlaybackStream {
    type Item = Arc<SimulationFrame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.state == PlaybackState::Complete {
                return Poll::Ready(None);
            }

            // Wait for interval tick
            ready!(this.interval.poll_tick(cx));

            if let Some(frame) = this.take_frame() {
                return Poll::Ready(Some(frame));
            }
            // Nothing this tick; polling again registers for the next one
        }
    }
}
