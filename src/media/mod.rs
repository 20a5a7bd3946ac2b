//! rodio implementations of the media sink and the routing primitive.

pub mod graph;
pub mod sink;

pub use graph::{RodioGraph, Route, RouteShared, RoutedSource};
pub use sink::RodioSink;
