//! In-memory sink and graph primitives for driving a session without audio.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use tap_trainer::catalog::{Catalog, Track};
use tap_trainer::config::GesturePolicy;
use tap_trainer::dynamics::CompressorParams;
use tap_trainer::playback::{
    AudioRoutingGraph, GestureClassifier, GraphBackend, GraphError, MediaSink, NodeId,
    PlayTicket, PlaybackController, RoutingState, Session, SinkError, SinkEvent, Topology,
};

pub const WINDOW: Duration = Duration::from_millis(600);
pub const DELAY: Duration = Duration::from_millis(220);

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Everything the mock sink was asked to do, plus knobs for its behavior.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub loads: Vec<String>,
    pub seeks: Vec<Duration>,
    pub plays: Vec<PlayTicket>,
    pub pauses: usize,
    pub volumes: Vec<f32>,
    pub loaded: Option<String>,
    pub playing: bool,
    /// Refuse every play request
    pub refuse: bool,
    /// Sources whose load fails
    pub broken: HashSet<String>,
    /// Hold play requests until the test resolves them
    pub manual: bool,
    pub pending: Vec<PlayTicket>,
}

pub struct MockSink {
    log: Rc<RefCell<SinkLog>>,
    events: Sender<SinkEvent>,
}

/// Test-side view of a `MockSink`.
#[derive(Clone)]
pub struct SinkHandle {
    pub log: Rc<RefCell<SinkLog>>,
    events: Sender<SinkEvent>,
}

fn finish(
    log: &RefCell<SinkLog>,
    events: &Sender<SinkEvent>,
    ticket: PlayTicket,
    result: Result<(), SinkError>,
) {
    let mut log = log.borrow_mut();
    if result.is_ok() && !log.playing {
        log.playing = true;
        events.send(SinkEvent::Played).unwrap();
    }
    events
        .send(SinkEvent::PlayResolved { ticket, result })
        .unwrap();
}

impl SinkHandle {
    pub fn resolve_next(&self, result: Result<(), SinkError>) {
        let ticket = self.log.borrow_mut().pending.remove(0);
        finish(&self.log, &self.events, ticket, result);
    }

    /// Pause from outside the controller, e.g. a system media key.
    pub fn external_pause(&self) {
        self.log.borrow_mut().playing = false;
        self.events.send(SinkEvent::Paused).unwrap();
    }

    pub fn external_play(&self) {
        self.log.borrow_mut().playing = true;
        self.events.send(SinkEvent::Played).unwrap();
    }

    pub fn end(&self) {
        self.log.borrow_mut().playing = false;
        self.events.send(SinkEvent::Ended).unwrap();
    }

    pub fn send(&self, event: SinkEvent) {
        self.events.send(event).unwrap();
    }

    pub fn loads(&self) -> Vec<String> {
        self.log.borrow().loads.clone()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.log.borrow().volumes.last().copied()
    }
}

impl MediaSink for MockSink {
    fn load(&mut self, uri: &str) -> Result<(), SinkError> {
        let mut log = self.log.borrow_mut();
        log.playing = false;
        if log.broken.contains(uri) {
            log.loaded = None;
            return Err(SinkError::Load {
                uri: uri.to_string(),
                reason: "unreadable".to_string(),
            });
        }
        log.loads.push(uri.to_string());
        log.loaded = Some(uri.to_string());
        Ok(())
    }

    fn play(&mut self, ticket: PlayTicket) {
        let (manual, refuse) = {
            let mut log = self.log.borrow_mut();
            log.plays.push(ticket);
            (log.manual, log.refuse)
        };
        if manual {
            self.log.borrow_mut().pending.push(ticket);
            return;
        }
        let result = if refuse {
            Err(SinkError::Refused("autoplay blocked".to_string()))
        } else {
            Ok(())
        };
        finish(&self.log, &self.events, ticket, result);
    }

    fn pause(&mut self) {
        let mut log = self.log.borrow_mut();
        log.pauses += 1;
        if log.playing {
            log.playing = false;
            self.events.send(SinkEvent::Paused).unwrap();
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), SinkError> {
        let mut log = self.log.borrow_mut();
        if log.loaded.is_none() {
            return Err(SinkError::NothingLoaded);
        }
        log.seeks.push(position);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.borrow_mut().volumes.push(volume);
    }
}

pub const DESTINATION: NodeId = NodeId(0);

/// Graph primitive that keeps its wiring in a `Topology`.
#[derive(Debug, Default)]
pub struct MockGraph {
    pub unavailable: bool,
    pub source_attempts: usize,
    pub source: Option<NodeId>,
    pub gain: Option<NodeId>,
    pub gain_value: Option<f32>,
    pub topology: Topology,
    pub commits: usize,
    next_id: u32,
}

impl MockGraph {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of distinct source-to-destination paths, once a source exists.
    pub fn paths(&self) -> Option<usize> {
        self.source
            .map(|source| self.topology.path_count(source, DESTINATION))
    }

    fn alloc(&mut self) -> Result<NodeId, GraphError> {
        if self.unavailable {
            return Err(GraphError::Unavailable("no audio graph".to_string()));
        }
        self.next_id += 1;
        Ok(NodeId(self.next_id))
    }
}

impl GraphBackend for MockGraph {
    fn create_source(&mut self) -> Result<NodeId, GraphError> {
        self.source_attempts += 1;
        if self.source.is_some() {
            return Err(GraphError::SourceAlreadyBound);
        }
        let id = self.alloc()?;
        self.source = Some(id);
        Ok(id)
    }

    fn create_compressor(&mut self, _params: &CompressorParams) -> Result<NodeId, GraphError> {
        self.alloc()
    }

    fn create_gain(&mut self, value: f32) -> Result<NodeId, GraphError> {
        let id = self.alloc()?;
        self.gain = Some(id);
        self.gain_value = Some(value);
        Ok(id)
    }

    fn destination(&self) -> NodeId {
        DESTINATION
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.topology.connect(from, to);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        self.topology.disconnect(node);
    }

    fn set_gain(&mut self, node: NodeId, value: f32) {
        if Some(node) == self.gain {
            self.gain_value = Some(value);
        }
    }

    fn commit(&mut self) {
        self.commits += 1;
    }
}

pub fn two_track_catalog() -> Catalog {
    Catalog::new(vec![
        Track::new(1, "A", "a.m4a"),
        Track::new(2, "B", "b.m4a"),
    ])
    .unwrap()
}

pub type MockSession = Session<MockSink, MockGraph>;

pub fn session_with(policy: GesturePolicy, graph: MockGraph) -> (MockSession, SinkHandle) {
    let (tx, rx) = mpsc::channel();
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let sink = MockSink {
        log: log.clone(),
        events: tx.clone(),
    };
    let handle = SinkHandle { log, events: tx };

    let routing = AudioRoutingGraph::new(graph, RoutingState::default());
    let controller = PlaybackController::new(two_track_catalog(), sink, routing);
    let window = match policy {
        GesturePolicy::Count => WINDOW,
        GesturePolicy::Deferred => DELAY,
    };
    let classifier = GestureClassifier::new(policy, window);

    (Session::new(classifier, controller, rx), handle)
}

pub fn session(policy: GesturePolicy) -> (MockSession, SinkHandle) {
    session_with(policy, MockGraph::default())
}
