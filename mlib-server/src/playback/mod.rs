//! Playback Queue and Ad-hoc Queue

pub mod adhoc;
pub mod transport;

pub use adhoc::{AdhocQueue, QueueError};
pub use transport::{PlaybackError, PlaybackMode, PlaybackState};
