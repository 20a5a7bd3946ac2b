//! Gesture classification, playback control and audio routing.
//!
//! Everything here is independent of rodio and the terminal; the sink and
//! the graph primitive are reached only through the `MediaSink` and
//! `GraphBackend` traits.

pub mod controller;
pub mod gesture;
pub mod routing;
pub mod session;
pub mod sink;

pub use controller::{Phase, PlaybackController, PlaybackError, PlaybackState};
pub use gesture::{GestureClassifier, Intent};
pub use routing::{AudioRoutingGraph, GraphBackend, GraphError, NodeId, RoutingState, Topology};
pub use session::Session;
pub use sink::{MediaSink, PlayTicket, SinkError, SinkEvent};
