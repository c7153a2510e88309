//! Stream utilities

mod playback;

pub use playback::{PlaybackState, PlaybackStream};
