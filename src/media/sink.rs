//! rodio-backed media sink.
//!
//! Decodes clips with rodio's decoder (m4a included), wraps them in a
//! `RoutedSource` so the routing graph can shape the output, and reports
//! play/pause/ended and play-request outcomes over an mpsc channel.

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use super::graph::{RodioGraph, RouteShared, RoutedSource};
use crate::dynamics::CompressorParams;
use crate::playback::sink::{MediaSink, PlayTicket, SinkError, SinkEvent};

type RodioSinkResult = Result<(RodioSink, mpsc::Receiver<SinkEvent>), Box<dyn Error>>;

pub struct RodioSink {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Sink,
    events_tx: mpsc::Sender<SinkEvent>,
    shared: Arc<RouteShared>,
    current_path: Option<PathBuf>,
    playing: bool,
    volume: f32,
}

impl RodioSink {
    pub fn new() -> RodioSinkResult {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;
        sink.pause();
        let (events_tx, events_rx) = mpsc::channel();

        Ok((
            Self {
                _stream: stream,
                stream_handle,
                sink,
                events_tx,
                shared: Arc::new(RouteShared::new(CompressorParams::default())),
                current_path: None,
                playing: false,
                volume: 1.0,
            },
            events_rx,
        ))
    }

    /// Graph primitive bound to this sink's output.
    pub fn routing_backend(&self, enabled: bool) -> RodioGraph {
        RodioGraph::new(self.shared.clone(), enabled)
    }

    fn emit(&self, event: SinkEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Swap in a fresh rodio sink holding `path`, paused.
    fn open(&mut self, path: &Path) -> Result<(), SinkError> {
        self.sink.stop();
        self.sink = Sink::try_new(&self.stream_handle).map_err(|e| SinkError::Load {
            uri: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.sink.pause();
        self.sink.set_volume(self.volume);

        let load_err = |reason: String| SinkError::Load {
            uri: path.display().to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| load_err(e.to_string()))?;

        log::info!(
            "Decoded {}: {} Hz, {} channels, duration {:?}",
            path.display(),
            decoder.sample_rate(),
            decoder.channels(),
            decoder.total_duration()
        );

        let source = RoutedSource::new(decoder.convert_samples::<f32>(), self.shared.clone());
        self.sink.append(source);
        Ok(())
    }

    /// rodio cannot seek every container; reopening starts over at zero.
    fn reload(&mut self) -> Result<(), SinkError> {
        let path = self.current_path.clone().ok_or(SinkError::NothingLoaded)?;
        self.open(&path)?;
        if self.playing {
            self.sink.play();
        }
        Ok(())
    }
}

impl MediaSink for RodioSink {
    fn load(&mut self, uri: &str) -> Result<(), SinkError> {
        let path = PathBuf::from(uri);
        self.current_path = None;
        self.open(&path)?;
        self.current_path = Some(path);
        Ok(())
    }

    fn play(&mut self, ticket: PlayTicket) {
        if self.current_path.is_none() {
            self.emit(SinkEvent::PlayResolved {
                ticket,
                result: Err(SinkError::NothingLoaded),
            });
            return;
        }

        // A finished source plays again from the top
        if self.sink.empty()
            && let Err(e) = self.reload()
        {
            self.emit(SinkEvent::PlayResolved {
                ticket,
                result: Err(SinkError::Refused(e.to_string())),
            });
            return;
        }

        self.sink.play();
        if !self.playing {
            self.playing = true;
            self.emit(SinkEvent::Played);
        }
        self.emit(SinkEvent::PlayResolved {
            ticket,
            result: Ok(()),
        });
    }

    fn pause(&mut self) {
        self.sink.pause();
        if self.playing {
            self.playing = false;
            self.emit(SinkEvent::Paused);
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), SinkError> {
        if self.current_path.is_none() {
            return Err(SinkError::NothingLoaded);
        }

        match self.sink.try_seek(position) {
            Ok(()) => Ok(()),
            Err(e) if position.is_zero() => {
                log::debug!("Seek unsupported ({e}), reloading source");
                self.reload()
            }
            Err(e) => Err(SinkError::Seek(e.to_string())),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }

    fn tick(&mut self) {
        if self.playing && self.sink.empty() {
            self.playing = false;
            self.emit(SinkEvent::Ended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn is_ci_environment() -> bool {
        // Check common CI environment variables
        std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("TRAVIS").is_ok()
            || std::env::var("CIRCLECI").is_ok()
    }

    fn skip_if_no_audio() -> Result<(), Box<dyn Error>> {
        if is_ci_environment() {
            eprintln!("Skipping audio test in CI environment");
            return Err("Audio not available in CI".into());
        }
        Ok(())
    }

    fn write_tone(path: &Path) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..4410 {
            let s = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_play_without_source_is_rejected() {
        if skip_if_no_audio().is_err() {
            return;
        }
        let Ok((mut sink, rx)) = RodioSink::new() else {
            return;
        };

        sink.play(PlayTicket(1));
        assert_eq!(
            rx.try_recv().unwrap(),
            SinkEvent::PlayResolved {
                ticket: PlayTicket(1),
                result: Err(SinkError::NothingLoaded),
            }
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        if skip_if_no_audio().is_err() {
            return;
        }
        let Ok((mut sink, _rx)) = RodioSink::new() else {
            return;
        };

        let result = sink.load("/nonexistent/clip.m4a");
        assert!(matches!(result, Err(SinkError::Load { .. })));
        assert!(sink.seek(Duration::ZERO).is_err());
    }

    #[test]
    fn test_load_play_pause_events() {
        if skip_if_no_audio().is_err() {
            return;
        }
        let Ok((mut sink, rx)) = RodioSink::new() else {
            return;
        };

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write_tone(&path);

        sink.load(path.to_str().unwrap()).unwrap();
        assert!(sink.seek(Duration::ZERO).is_ok());
        sink.play(PlayTicket(7));
        assert_eq!(rx.try_recv().unwrap(), SinkEvent::Played);
        assert_eq!(
            rx.try_recv().unwrap(),
            SinkEvent::PlayResolved {
                ticket: PlayTicket(7),
                result: Ok(()),
            }
        );
        assert!(sink.playing);

        sink.pause();
        assert_eq!(rx.try_recv().unwrap(), SinkEvent::Paused);
        // Pausing twice reports nothing new
        sink.pause();
        assert!(rx.try_recv().is_err());
    }
}
