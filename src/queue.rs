//! FIFO buffer between the session and the playback driver.
//!
//! A [`FrameQueue`] is the producer half and is owned by the session task; it is the
//! only way to add frames. The [`FrameConsumer`] half is handed to the playback driver
//! and can only take frames off the head. Frames keep arrival order; `frame_number` is
//! never used for resequencing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::SimulationFrame;

#[derive(Debug, Default)]
struct Buffer {
    frames: VecDeque<Arc<SimulationFrame>>,
    /// Set once the sentinel has been enqueued
    sealed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    buffer: Mutex<Buffer>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // Buffer has no invariants a panicking holder could break
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer half of the frame queue.
#[derive(Debug, Default)]
pub struct FrameQueue {
    shared: Arc<Shared>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the consumer half for this queue.
    pub fn consumer(&self) -> FrameConsumer {
        FrameConsumer { shared: Arc::clone(&self.shared) }
    }

    /// Append a frame to the tail.
    pub fn enqueue(&self, frame: SimulationFrame) {
        let mut buffer = self.shared.lock();
        if frame.is_sentinel() {
            buffer.sealed = true;
        }
        buffer.frames.push_back(Arc::new(frame));
    }

    /// Append frames in iteration order.
    pub fn enqueue_all<I>(&self, frames: I)
    where
        I: IntoIterator<Item = SimulationFrame>,
    {
        let mut buffer = self.shared.lock();
        for frame in frames {
            if frame.is_sentinel() {
                buffer.sealed = true;
            }
            buffer.frames.push_back(Arc::new(frame));
        }
    }

    /// Append the end-of-stream sentinel.
    pub fn seal(&self) {
        self.enqueue(SimulationFrame::sentinel());
    }

    pub fn len(&self) -> usize {
        self.shared.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer half of the frame queue.
#[derive(Debug)]
pub struct FrameConsumer {
    shared: Arc<Shared>,
}

impl FrameConsumer {
    /// Remove and return the head frame, or `None` if nothing is buffered.
    pub fn dequeue(&self) -> Option<Arc<SimulationFrame>> {
        self.shared.lock().frames.pop_front()
    }

    /// Number of buffered frames, including a pending sentinel
    pub fn len(&self) -> usize {
        self.shared.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the sentinel has been enqueued, i.e. no further frames will arrive.
    pub fn is_sealed(&self) -> bool {
        self.shared.lock().sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dequeue_returns_frames_in_arrival_order() {
        let queue = FrameQueue::new();
        let consumer = queue.consumer();

        queue.enqueue(SimulationFrame::new(7));
        queue.enqueue_all([SimulationFrame::new(3), SimulationFrame::new(3)]);

        let numbers: Vec<i64> =
            std::iter::from_fn(|| consumer.dequeue()).map(|f| f.frame_number).collect();
        assert_eq!(numbers, vec![7, 3, 3]);
    }

    #[test]
    fn empty_queue_dequeue_is_idempotent() {
        let queue = FrameQueue::new();
        let consumer = queue.consumer();

        for _ in 0..100 {
            assert!(consumer.dequeue().is_none());
        }
        assert!(consumer.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn sealing_is_visible_to_consumer() {
        let queue = FrameQueue::new();
        let consumer = queue.consumer();

        queue.enqueue(SimulationFrame::new(0));
        assert!(!consumer.is_sealed());

        queue.seal();
        assert!(consumer.is_sealed());
        assert_eq!(consumer.len(), 2);

        assert_eq!(consumer.dequeue().map(|f| f.frame_number), Some(0));
        assert!(consumer.dequeue().is_some_and(|f| f.is_sentinel()));
        assert!(consumer.is_sealed());
    }

    proptest! {
        #[test]
        fn queue_preserves_fifo_for_any_sequence(numbers in prop::collection::vec(0i64..10_000, 0..200)) {
            let queue = FrameQueue::new();
            let consumer = queue.consumer();

            for &n in &numbers {
                queue.enqueue(SimulationFrame::new(n));
            }

            let drained: Vec<i64> = std::iter::from_fn(|| consumer.dequeue()).map(|f| f.frame_number).collect();
            prop_assert_eq!(drained, numbers);
            prop_assert!(consumer.dequeue().is_none());
        }
    }
}
