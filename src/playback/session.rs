//! One listening session: a gesture classifier, a playback controller and
//! the sink's notification channel, pumped from a single thread.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use super::controller::PlaybackController;
use super::gesture::GestureClassifier;
use super::routing::GraphBackend;
use super::sink::{MediaSink, SinkEvent};
use crate::catalog::TrackId;

pub struct Session<S: MediaSink, B: GraphBackend> {
    classifier: GestureClassifier,
    controller: PlaybackController<S, B>,
    events: Receiver<SinkEvent>,
}

impl<S: MediaSink, B: GraphBackend> Session<S, B> {
    pub fn new(
        classifier: GestureClassifier,
        controller: PlaybackController<S, B>,
        events: Receiver<SinkEvent>,
    ) -> Self {
        Self {
            classifier,
            controller,
            events,
        }
    }

    pub fn controller(&self) -> &PlaybackController<S, B> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<S, B> {
        &mut self.controller
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    /// Feed one tap from the track grid.
    pub fn tap(&mut self, track: TrackId, at: Instant) {
        // Earlier completions must land before the new intent is judged
        self.pump();
        if let Some(intent) = self.classifier.tap(track, at) {
            self.controller.apply(intent);
        }
        self.pump();
    }

    /// Drive time-based work: sink housekeeping and deferred taps.
    pub fn tick(&mut self, now: Instant) {
        self.controller.tick();
        self.pump();
        if let Some(intent) = self.classifier.poll(now) {
            self.controller.apply(intent);
            self.pump();
        }
    }

    /// Apply every notification the sink has sent so far.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            log::debug!("Sink event {event:?}");
            self.controller.handle_event(event);
        }
    }

    /// Cancel pending gesture work and silence the sink.
    pub fn teardown(&mut self) {
        self.classifier.reset();
        self.controller.shutdown();
        self.pump();
    }
}
