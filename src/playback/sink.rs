//! Media sink contract.
//!
//! The controller never decodes or outputs audio itself. It drives a sink
//! through this trait and learns what actually happened from the
//! notifications the sink sends over its channel, in the order the sink
//! produced them.

use std::time::Duration;
use thiserror::Error;

/// Pairs a play request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("no source loaded")]
    NothingLoaded,
    #[error("cannot open {uri}: {reason}")]
    Load { uri: String, reason: String },
    #[error("playback refused: {0}")]
    Refused(String),
    #[error("seek failed: {0}")]
    Seek(String),
}

/// Notifications emitted by a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Output started or resumed
    Played,
    /// Output paused, by anyone
    Paused,
    /// The loaded source ran out
    Ended,
    /// Outcome of the play request carrying `ticket`
    PlayResolved {
        ticket: PlayTicket,
        result: Result<(), SinkError>,
    },
}

pub trait MediaSink {
    /// Replace the loaded source. Output stays paused until `play`.
    fn load(&mut self, uri: &str) -> Result<(), SinkError>;

    /// Request playback. Completion arrives later as `PlayResolved`.
    fn play(&mut self, ticket: PlayTicket);

    fn pause(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), SinkError>;

    fn set_volume(&mut self, volume: f32);

    /// Housekeeping hook for sinks that detect state by polling.
    fn tick(&mut self) {}
}
