//! Audio routing graph: `source -> [compressor] -> gain -> destination`.
//!
//! The graph is built lazily on the first play request and only once per
//! sink. Every change of the compressor's place in the chain tears down all
//! internal connections and wires the desired path again, then commits the
//! result to the backend in one step. At rest there is exactly one path from
//! source to destination.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::dynamics::CompressorParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("audio graph unavailable: {0}")]
    Unavailable(String),
    #[error("a source node is already bound to this sink")]
    SourceAlreadyBound,
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
}

/// Node-level primitive the routing graph is built on.
pub trait GraphBackend {
    /// Bind a source node to the sink output. Only one may ever exist.
    fn create_source(&mut self) -> Result<NodeId, GraphError>;
    fn create_compressor(&mut self, params: &CompressorParams) -> Result<NodeId, GraphError>;
    fn create_gain(&mut self, value: f32) -> Result<NodeId, GraphError>;
    fn destination(&self) -> NodeId;
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError>;
    /// Drop every outgoing connection of `node`. Never fails.
    fn disconnect(&mut self, node: NodeId);
    fn set_gain(&mut self, node: NodeId, value: f32);
    /// Make staged connection changes audible.
    fn commit(&mut self);
}

/// Directed edge set shared by backends for staging and path checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl Topology {
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        self.edges.insert((from, to));
    }

    pub fn disconnect(&mut self, node: NodeId) {
        self.edges.retain(|&(from, _)| from != node);
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Number of distinct paths from `from` to `to`. The graph is tiny and
    /// acyclic as built here, so a depth-first walk is plenty.
    pub fn path_count(&self, from: NodeId, to: NodeId) -> usize {
        self.count_paths(from, to, &mut Vec::new())
    }

    fn count_paths(&self, node: NodeId, to: NodeId, visiting: &mut Vec<NodeId>) -> usize {
        if node == to {
            return 1;
        }
        if visiting.contains(&node) {
            return 0;
        }
        visiting.push(node);
        let total = self
            .edges
            .iter()
            .filter(|(from, _)| *from == node)
            .map(|&(_, next)| self.count_paths(next, to, visiting))
            .sum();
        visiting.pop();
        total
    }

    /// Sequence of nodes on the path from `from` to `to`, if exactly one exists.
    pub fn single_path(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        if self.path_count(from, to) != 1 {
            return None;
        }
        let mut path = vec![from];
        let mut node = from;
        while node != to {
            node = self
                .edges
                .iter()
                .filter(|(f, _)| *f == node)
                .map(|&(_, next)| next)
                .find(|&next| self.path_count(next, to) == 1)?;
            path.push(node);
        }
        Some(path)
    }
}

/// What the UI renders about routing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingState {
    pub normalization: bool,
    pub gain: f32,
}

impl Default for RoutingState {
    fn default() -> Self {
        Self {
            normalization: false,
            gain: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("graph initialization unavailable: {0}")]
    InitializationUnavailable(GraphError),
    #[error("graph rewiring failed: {0}")]
    Rewire(GraphError),
}

#[derive(Debug, Clone, Copy)]
struct Nodes {
    source: NodeId,
    compressor: NodeId,
    gain: NodeId,
}

#[derive(Debug, Clone, Copy)]
enum Init {
    Pending,
    Ready(Nodes),
    Unavailable,
}

pub struct AudioRoutingGraph<B: GraphBackend> {
    backend: B,
    params: CompressorParams,
    init: Init,
    state: RoutingState,
}

impl<B: GraphBackend> AudioRoutingGraph<B> {
    pub fn new(backend: B, state: RoutingState) -> Self {
        Self::with_params(backend, state, CompressorParams::default())
    }

    pub fn with_params(backend: B, state: RoutingState, params: CompressorParams) -> Self {
        Self {
            backend,
            params,
            init: Init::Pending,
            state,
        }
    }

    pub fn state(&self) -> RoutingState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.init, Init::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.init, Init::Unavailable)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the node chain once. Safe to call on every play request.
    pub fn ensure_initialized(&mut self) -> Result<(), RoutingError> {
        match self.init {
            Init::Ready(_) => return Ok(()),
            Init::Unavailable => {
                return Err(RoutingError::InitializationUnavailable(
                    GraphError::Unavailable("initialization previously failed".to_string()),
                ));
            }
            Init::Pending => {}
        }

        match self.build() {
            Ok(nodes) => {
                self.init = Init::Ready(nodes);
                self.rewire(nodes)?;
                log::info!(
                    "Audio routing ready (normalization {}, gain {:.2})",
                    on_off(self.state.normalization),
                    self.state.gain
                );
                Ok(())
            }
            Err(e) => {
                // A partially built graph may already own the sink's source
                // node, so never retry.
                self.init = Init::Unavailable;
                Err(RoutingError::InitializationUnavailable(e))
            }
        }
    }

    fn build(&mut self) -> Result<Nodes, GraphError> {
        let source = self.backend.create_source()?;
        let compressor = self.backend.create_compressor(&self.params)?;
        let gain = self.backend.create_gain(self.state.gain)?;
        Ok(Nodes {
            source,
            compressor,
            gain,
        })
    }

    pub fn set_normalization(&mut self, enabled: bool) -> Result<(), RoutingError> {
        self.state.normalization = enabled;
        if let Init::Ready(nodes) = self.init {
            self.rewire(nodes)?;
            log::info!("Normalization {}", on_off(enabled));
        }
        Ok(())
    }

    /// Set the gain multiplier. No clamping or ramping is applied.
    pub fn set_gain(&mut self, value: f32) {
        self.state.gain = value;
        if let Init::Ready(nodes) = self.init {
            self.backend.set_gain(nodes.gain, value);
            log::debug!("Gain set to {value:.2}");
        }
    }

    fn rewire(&mut self, nodes: Nodes) -> Result<(), RoutingError> {
        self.backend.disconnect(nodes.source);
        self.backend.disconnect(nodes.compressor);
        self.backend.disconnect(nodes.gain);

        let destination = self.backend.destination();
        let into_gain = if self.state.normalization {
            self.backend
                .connect(nodes.source, nodes.compressor)
                .and_then(|_| self.backend.connect(nodes.compressor, nodes.gain))
        } else {
            self.backend.connect(nodes.source, nodes.gain)
        };
        let wired = into_gain.and_then(|_| self.backend.connect(nodes.gain, destination));

        // Commit even on failure so the backend never keeps a half-staged edit
        self.backend.commit();
        wired.map_err(RoutingError::Rewire)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
