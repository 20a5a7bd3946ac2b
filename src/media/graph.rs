//! Routing primitive on top of rodio.
//!
//! rodio has no node graph, so the graph lives on the control side as a
//! staged `Topology`. `commit` reduces it to a single `Route` that the audio
//! thread reads through atomics from inside `RoutedSource`, alongside the gain.

use rodio::Source;
use rodio::source::SeekError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::time::Duration;

use crate::dynamics::{Compressor, CompressorParams};
use crate::playback::routing::{GraphBackend, GraphError, NodeId, Topology};

const DESTINATION: NodeId = NodeId(0);

/// Time the compressor takes to fade in or out when the route changes.
const ROUTE_FADE_SECS: f32 = 0.005;

/// Signal path the audio thread applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Route {
    /// No graph built: samples pass through untouched
    Direct = 0,
    /// Graph built, compressor bypassed
    Bypass = 1,
    /// Graph built, compressor in the path
    Compressed = 2,
    /// Graph built but nothing reaches the destination
    Silent = 3,
}

impl Route {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Route::Bypass,
            2 => Route::Compressed,
            3 => Route::Silent,
            _ => Route::Direct,
        }
    }
}

/// State shared between one sink, its graph and the audio thread.
#[derive(Debug)]
pub struct RouteShared {
    route: AtomicU8,
    gain_bits: AtomicU32,
    source_bound: AtomicBool,
    params: CompressorParams,
}

impl RouteShared {
    pub fn new(params: CompressorParams) -> Self {
        Self {
            route: AtomicU8::new(Route::Direct as u8),
            gain_bits: AtomicU32::new(1.0_f32.to_bits()),
            source_bound: AtomicBool::new(false),
            params,
        }
    }

    pub fn route(&self) -> Route {
        Route::from_u8(self.route.load(Ordering::Acquire))
    }

    fn publish(&self, route: Route) {
        self.route.store(route as u8, Ordering::Release);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    fn set_gain(&self, value: f32) {
        self.gain_bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

pub struct RodioGraph {
    shared: Arc<RouteShared>,
    enabled: bool,
    next_id: u32,
    source: Option<NodeId>,
    compressor: Option<NodeId>,
    gain: Option<NodeId>,
    staged: Topology,
}

impl RodioGraph {
    pub fn new(shared: Arc<RouteShared>, enabled: bool) -> Self {
        Self {
            shared,
            enabled,
            next_id: 0,
            source: None,
            compressor: None,
            gain: None,
            staged: Topology::default(),
        }
    }

    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    fn known(&self, node: NodeId) -> bool {
        node == DESTINATION
            || [self.source, self.compressor, self.gain].contains(&Some(node))
    }

    fn ensure_enabled(&self) -> Result<(), GraphError> {
        if self.enabled {
            Ok(())
        } else {
            Err(GraphError::Unavailable(
                "routing disabled by configuration".to_string(),
            ))
        }
    }
}

impl GraphBackend for RodioGraph {
    fn create_source(&mut self) -> Result<NodeId, GraphError> {
        self.ensure_enabled()?;
        if self.shared.source_bound.swap(true, Ordering::AcqRel) {
            return Err(GraphError::SourceAlreadyBound);
        }
        let id = self.alloc();
        self.source = Some(id);
        Ok(id)
    }

    fn create_compressor(&mut self, params: &CompressorParams) -> Result<NodeId, GraphError> {
        self.ensure_enabled()?;
        if *params != self.shared.params {
            log::warn!("Compressor parameters are fixed per sink; ignoring {params:?}");
        }
        let id = self.alloc();
        self.compressor = Some(id);
        Ok(id)
    }

    fn create_gain(&mut self, value: f32) -> Result<NodeId, GraphError> {
        self.ensure_enabled()?;
        let id = self.alloc();
        self.gain = Some(id);
        self.shared.set_gain(value);
        Ok(id)
    }

    fn destination(&self) -> NodeId {
        DESTINATION
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        for node in [from, to] {
            if !self.known(node) {
                return Err(GraphError::UnknownNode(node));
            }
        }
        self.staged.connect(from, to);
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) {
        self.staged.disconnect(node);
    }

    fn set_gain(&mut self, node: NodeId, value: f32) {
        if Some(node) == self.gain {
            self.shared.set_gain(value);
        } else {
            log::warn!("set_gain on non-gain node {node:?}");
        }
    }

    fn commit(&mut self) {
        let route = match self
            .source
            .and_then(|source| self.staged.single_path(source, DESTINATION))
        {
            Some(path) if self.compressor.is_some_and(|c| path.contains(&c)) => Route::Compressed,
            Some(_) => Route::Bypass,
            None => Route::Silent,
        };
        log::debug!("Publishing route {route:?}");
        self.shared.publish(route);
    }
}

/// Applies the published route and gain to a decoded source, frame by frame.
///
/// The compressor's detector runs on every frame whatever the route, and
/// its contribution is faded in and out over `ROUTE_FADE_SECS` so a toggle
/// never jumps in level.
pub struct RoutedSource<S> {
    inner: S,
    shared: Arc<RouteShared>,
    compressor: Compressor,
    wet: f32,
    fade_step: f32,
    frame: Vec<f32>,
    frame_pos: usize,
}

impl<S> RoutedSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, shared: Arc<RouteShared>) -> Self {
        let sample_rate = inner.sample_rate().max(1);
        let compressor = Compressor::new(shared.params, sample_rate);
        let channels = inner.channels().max(1) as usize;
        let wet = if shared.route() == Route::Compressed {
            1.0
        } else {
            0.0
        };
        Self {
            inner,
            shared,
            compressor,
            wet,
            fade_step: 1.0 / (ROUTE_FADE_SECS * sample_rate as f32).max(1.0),
            frame: Vec::with_capacity(channels),
            frame_pos: 0,
        }
    }

    fn refill(&mut self) -> bool {
        self.frame.clear();
        self.frame_pos = 0;
        let channels = self.inner.channels().max(1);
        for _ in 0..channels {
            match self.inner.next() {
                Some(sample) => self.frame.push(sample),
                None => break,
            }
        }
        if self.frame.is_empty() {
            return false;
        }

        let route = self.shared.route();
        self.compressor.detect(&self.frame);
        let target = if route == Route::Compressed { 1.0 } else { 0.0 };
        self.wet = if self.wet < target {
            (self.wet + self.fade_step).min(target)
        } else {
            (self.wet - self.fade_step).max(target)
        };

        match route {
            Route::Direct => {}
            Route::Silent => self.frame.iter_mut().for_each(|s| *s = 0.0),
            Route::Bypass | Route::Compressed => {
                let level = 1.0 + self.wet * (self.compressor.gain() - 1.0);
                let gain = self.shared.gain();
                for sample in self.frame.iter_mut() {
                    *sample = (*sample * level).clamp(-1.0, 1.0) * gain;
                }
            }
        }
        true
    }
}

impl<S> Iterator for RoutedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_pos >= self.frame.len() && !self.refill() {
            return None;
        }
        let sample = self.frame[self.frame_pos];
        self.frame_pos += 1;
        Some(sample)
    }
}

impl<S> Source for RoutedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(pos)?;
        self.frame.clear();
        self.frame_pos = 0;
        self.compressor.reset();
        Ok(())
    }
}
