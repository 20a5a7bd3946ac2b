//! Playback controller: the single owner of `PlaybackState`.
//!
//! Intents become sink and routing operations here. Play requests complete
//! asynchronously, so `is_playing` only turns true once the matching
//! `PlayResolved` notification is observed. Anything requested while a play
//! is still in flight waits in a queue and runs, in order, right after that
//! completion is handled.

use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

use super::gesture::Intent;
use super::routing::{AudioRoutingGraph, GraphBackend, RoutingError, RoutingState};
use super::sink::{MediaSink, PlayTicket, SinkError, SinkEvent};
use crate::catalog::{Catalog, TrackId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_track: Option<TrackId>,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadedPaused,
    LoadedPlaying,
}

impl PlaybackState {
    pub fn phase(&self) -> Phase {
        match (self.current_track, self.is_playing) {
            (None, _) => Phase::Idle,
            (Some(_), false) => Phase::LoadedPaused,
            (Some(_), true) => Phase::LoadedPlaying,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("track {0} is not in the catalog")]
    UnknownTrack(TrackId),
    #[error("playback rejected for track {track}: {reason}")]
    PlaybackRejected { track: TrackId, reason: SinkError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    PlayFromStart(TrackId),
    PlayOrResume(TrackId),
    Toggle(TrackId),
    Pause,
    Restart(TrackId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayKind {
    FromStart,
    Resume,
    Restart,
}

#[derive(Debug, Clone, Copy)]
struct PendingPlay {
    ticket: PlayTicket,
    track: TrackId,
    kind: PlayKind,
}

pub struct PlaybackController<S: MediaSink, B: GraphBackend> {
    catalog: Catalog,
    sink: S,
    routing: AudioRoutingGraph<B>,
    state: PlaybackState,
    loaded: Option<TrackId>,
    in_flight: Option<PendingPlay>,
    queued: VecDeque<Command>,
    next_ticket: u64,
    volume: f32,
    last_error: Option<PlaybackError>,
    degraded_logged: bool,
}

impl<S: MediaSink, B: GraphBackend> PlaybackController<S, B> {
    pub fn new(catalog: Catalog, sink: S, routing: AudioRoutingGraph<B>) -> Self {
        Self {
            catalog,
            sink,
            routing,
            state: PlaybackState::default(),
            loaded: None,
            in_flight: None,
            queued: VecDeque::new(),
            next_ticket: 0,
            volume: 1.0,
            last_error: None,
            degraded_logged: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn routing_state(&self) -> RoutingState {
        self.routing.state()
    }

    /// True once the routing graph failed to initialize and audio bypasses it.
    pub fn routing_degraded(&self) -> bool {
        self.routing.is_unavailable()
    }

    pub fn routing(&self) -> &AudioRoutingGraph<B> {
        &self.routing
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn loaded_track(&self) -> Option<TrackId> {
        self.loaded
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_awaiting_play(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn apply(&mut self, intent: Intent) {
        log::info!("Intent {intent:?}");
        let command = match intent {
            Intent::PlayOrResume(track) => Command::PlayOrResume(track),
            Intent::Pause(_) => Command::Pause,
            Intent::Toggle(track) => Command::Toggle(track),
            Intent::Restart(track) => Command::Restart(track),
        };
        self.submit(command);
    }

    pub fn play_from_start(&mut self, track: TrackId) {
        self.submit(Command::PlayFromStart(track));
    }

    pub fn toggle_play_pause(&mut self, track: TrackId) {
        self.submit(Command::Toggle(track));
    }

    pub fn play_or_resume(&mut self, track: TrackId) {
        self.submit(Command::PlayOrResume(track));
    }

    pub fn pause(&mut self) {
        self.submit(Command::Pause);
    }

    pub fn restart(&mut self, track: TrackId) {
        self.submit(Command::Restart(track));
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.push_volume();
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.routing.set_gain(gain);
        if self.routing.is_unavailable() {
            self.push_volume();
        }
    }

    pub fn set_normalization(&mut self, enabled: bool) {
        if let Err(e) = self.routing.set_normalization(enabled) {
            log::error!("{e}");
        }
    }

    /// Let the sink do its periodic housekeeping.
    pub fn tick(&mut self) {
        self.sink.tick();
    }

    /// Stop output and drop anything still waiting to run. A completion
    /// that arrives afterwards is treated as stale.
    pub fn shutdown(&mut self) {
        self.in_flight = None;
        self.queued.clear();
        self.sink.pause();
        self.state.is_playing = false;
    }

    pub fn handle_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::PlayResolved { ticket, result } => self.resolve(ticket, result),
            SinkEvent::Played => {
                if self.in_flight.is_some() {
                    // The pending completion decides
                    return;
                }
                if self.state.current_track.is_some() && self.state.current_track == self.loaded {
                    self.state.is_playing = true;
                } else {
                    log::debug!("Ignoring play notification with no current track");
                }
            }
            SinkEvent::Paused => {
                self.state.is_playing = false;
            }
            SinkEvent::Ended => {
                log::info!("Track {:?} ended", self.state.current_track);
                self.state.is_playing = false;
            }
        }
    }

    fn submit(&mut self, command: Command) {
        if self.in_flight.is_some() {
            log::debug!("Play in flight, queueing {command:?}");
            self.queued.push_back(command);
            return;
        }
        self.execute(command);
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::PlayFromStart(track) => self.start(track, PlayKind::FromStart),
            Command::Restart(track) => self.start(track, PlayKind::Restart),
            Command::PlayOrResume(track) => {
                if self.is_current(track) {
                    if self.state.is_playing {
                        log::debug!("Track {track} already playing");
                    } else {
                        self.resume(track);
                    }
                } else {
                    self.start(track, PlayKind::FromStart);
                }
            }
            Command::Toggle(track) => {
                if self.is_current(track) {
                    if self.state.is_playing {
                        self.pause_now();
                    } else {
                        self.resume(track);
                    }
                } else {
                    self.start(track, PlayKind::FromStart);
                }
            }
            Command::Pause => self.pause_now(),
        }
    }

    fn is_current(&self, track: TrackId) -> bool {
        self.state.current_track == Some(track) && self.loaded == Some(track)
    }

    fn start(&mut self, track_id: TrackId, kind: PlayKind) {
        let Some(track) = self.catalog.get(track_id) else {
            log::warn!("Tap on unknown track {track_id}");
            self.last_error = Some(PlaybackError::UnknownTrack(track_id));
            return;
        };
        let source = track.source.clone();

        self.prepare_routing();

        if self.loaded != Some(track_id) {
            if let Err(reason) = self.sink.load(&source) {
                log::warn!("Failed to load {source}: {reason}");
                self.loaded = None;
                self.state = PlaybackState::default();
                self.last_error = Some(PlaybackError::PlaybackRejected {
                    track: track_id,
                    reason,
                });
                return;
            }
            log::info!("Loaded track {track_id} from {source}");
            self.loaded = Some(track_id);
            // The loaded source is the current track from here on; a swap
            // while playing never shows a paused state in between.
            self.state.current_track = Some(track_id);
        }

        if let Err(e) = self.sink.seek(Duration::ZERO) {
            log::warn!("Seek to start failed for track {track_id}: {e}");
        }

        self.request_play(track_id, kind);
    }

    fn resume(&mut self, track: TrackId) {
        self.prepare_routing();
        self.request_play(track, PlayKind::Resume);
    }

    fn pause_now(&mut self) {
        self.sink.pause();
        self.state.is_playing = false;
    }

    fn request_play(&mut self, track: TrackId, kind: PlayKind) {
        self.next_ticket += 1;
        let ticket = PlayTicket(self.next_ticket);
        log::debug!("Requesting play of track {track} ({kind:?}) with {ticket:?}");
        self.in_flight = Some(PendingPlay {
            ticket,
            track,
            kind,
        });
        self.sink.play(ticket);
    }

    fn resolve(&mut self, ticket: PlayTicket, result: Result<(), SinkError>) {
        let pending = match self.in_flight {
            Some(pending) if pending.ticket == ticket => pending,
            _ => {
                log::debug!("Ignoring completion for stale {ticket:?}");
                return;
            }
        };
        self.in_flight = None;

        match result {
            Ok(()) => {
                log::info!("Track {} playing ({:?})", pending.track, pending.kind);
                self.state.current_track = Some(pending.track);
                self.state.is_playing = true;
                self.last_error = None;
            }
            Err(reason) => {
                log::warn!("Playback of track {} rejected: {reason}", pending.track);
                // current_track keeps pointing at the loaded track so a retry
                // tap resumes it.
                self.state.is_playing = false;
                self.last_error = Some(PlaybackError::PlaybackRejected {
                    track: pending.track,
                    reason,
                });
            }
        }

        while self.in_flight.is_none() {
            let Some(command) = self.queued.pop_front() else {
                break;
            };
            self.execute(command);
        }
    }

    fn prepare_routing(&mut self) {
        match self.routing.ensure_initialized() {
            Ok(()) => {}
            Err(RoutingError::InitializationUnavailable(e)) => {
                if !self.degraded_logged {
                    log::warn!("Audio routing unavailable, playing through the sink directly: {e}");
                    self.degraded_logged = true;
                    self.push_volume();
                }
            }
            Err(e) => log::error!("{e}"),
        }
    }

    /// Without a routing graph the gain folds into the sink volume.
    fn push_volume(&mut self) {
        let volume = if self.routing.is_unavailable() {
            self.volume * self.routing.state().gain
        } else {
            self.volume
        };
        self.sink.set_volume(volume);
    }
}
