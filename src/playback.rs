//! Playback driver that feeds buffered frames to a renderer

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::queue::FrameConsumer;
use crate::stream::{PlaybackState, PlaybackStream};
use crate::types::{PlaybackRate, SimulationFrame};

/// Frame-consuming interface of the field renderer
pub trait FrameSink {
    /// Draw one frame
    fn render(&mut self, frame: &SimulationFrame);

    /// Called once after the last frame of a completed stream
    fn complete(&mut self) {}
}

/// How playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The sentinel was reached
    Complete { frames_played: u64 },
    /// The run was cancelled or abandoned first
    Cancelled { frames_played: u64 },
}

impl PlaybackOutcome {
    pub fn frames_played(&self) -> u64 {
        match self {
            PlaybackOutcome::Complete { frames_played }
            | PlaybackOutcome::Cancelled { frames_played } => *frames_played,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PlaybackOutcome::Complete { .. })
    }
}

/// Paced consumer of a frame queue
pub struct PlaybackDriver {
    stream: PlaybackStream,
}

impl PlaybackDriver {
    pub fn new(consumer: FrameConsumer, rate: PlaybackRate, lookahead: usize) -> Self {
        Self { stream: PlaybackStream::new(consumer, rate, lookahead) }
    }

    /// Follow playback state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.stream.subscribe_state()
    }

    /// Take the underlying frame stream instead of driving a sink
    pub fn into_stream(self) -> PlaybackStream {
        self.stream
    }

    /// Hand every frame to `sink` until the sentinel or until `cancel` fires
    pub async fn run<S>(mut self, sink: &mut S, cancel: &CancellationToken) -> PlaybackOutcome
    where
        S: FrameSink + ?Sized,
    {
        info!("Playback started");
        let mut frames_played = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Playback cancelled after {} frames", frames_played);
                    return PlaybackOutcome::Cancelled { frames_played };
                }
                next = self.stream.next() => next,
            };

            match next {
                Some(frame) => {
                    sink.render(&frame);
                    frames_played += 1;
                }
                None => {
                    debug!("Sentinel reached");
                    sink.complete();
                    info!("Playback complete ({} frames)", frames_played);
                    return PlaybackOutcome::Complete { frames_played };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FrameQueue;
    use crate::test_utils::FrameRecorder;
    use proptest::prelude::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn run_renders_then_completes() {
        let queue = FrameQueue::new();
        queue.enqueue_all((0..3).map(SimulationFrame::new));
        queue.seal();

        let mut recorder = FrameRecorder::default();
        let driver = PlaybackDriver::new(queue.consumer(), PlaybackRate::Native, 30);
        let outcome = driver.run(&mut recorder, &CancellationToken::new()).await;

        assert_eq!(outcome, PlaybackOutcome::Complete { frames_played: 3 });
        assert_eq!(recorder.frame_numbers(), vec![0, 1, 2]);
        assert_eq!(recorder.completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn into_stream_yields_frames_without_a_sink() {
        let queue = FrameQueue::new();
        queue.enqueue_all([7, 8].map(SimulationFrame::new));
        queue.seal();

        let driver = PlaybackDriver::new(queue.consumer(), PlaybackRate::Fps(30), 30);
        let state = driver.subscribe_state();
        let frames: Vec<_> = driver.into_stream().map(|f| f.frame_number).collect().await;

        assert_eq!(frames, vec![7, 8]);
        assert_eq!(*state.borrow(), PlaybackState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_a_buffering_driver() {
        let queue = FrameQueue::new();
        queue.enqueue(SimulationFrame::new(0));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        let mut recorder = FrameRecorder::default();
        let driver = PlaybackDriver::new(queue.consumer(), PlaybackRate::Native, 0);
        let outcome = driver.run(&mut recorder, &cancel).await;

        assert_eq!(outcome, PlaybackOutcome::Cancelled { frames_played: 1 });
        assert_eq!(recorder.completions, 0);
    }

    proptest! {
        #[test]
        fn driver_plays_exactly_what_was_enqueued(
            batches in prop::collection::vec(prop::collection::vec(0i64..1000, 0..10), 0..10),
            lookahead in 0usize..40,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let expected: Vec<i64> = batches.iter().flatten().copied().collect();
            let recorded = runtime.block_on(async {
                let queue = FrameQueue::new();
                let driver = PlaybackDriver::new(queue.consumer(), PlaybackRate::Native, lookahead);

                // Batches trickle in while the driver is already polling
                let producer = tokio::spawn(async move {
                    for batch in batches {
                        queue.enqueue_all(batch.into_iter().map(SimulationFrame::new));
                        tokio::time::sleep(Duration::from_millis(25)).await;
                    }
                    queue.seal();
                });

                let mut recorder = FrameRecorder::default();
                let outcome = driver.run(&mut recorder, &CancellationToken::new()).await;
                producer.await.unwrap();
                (outcome, recorder)
            });

            let (outcome, recorder) = recorded;
            prop_assert!(outcome.is_complete());
            prop_assert_eq!(recorder.frame_numbers(), expected);
            prop_assert_eq!(recorder.completions, 1);
        }
    }
}
