//! Main application state and control flow for the trainer.
//!
//! This module owns the terminal, the listening session and the event loop.
//! Mouse clicks on the track grid become taps, keys adjust routing and
//! volume, and every loop turn pumps sink notifications and fires any
//! deferred tap whose delay has run out.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

use super::ui;
use tap_trainer::catalog::Catalog;
use tap_trainer::config::{Config, GesturePolicy};
use tap_trainer::constants::{GAIN_MAX, GAIN_MIN, GAIN_STEP, VOLUME_MAX, VOLUME_MIN, VOLUME_STEP};
use tap_trainer::media::{RodioGraph, RodioSink};
use tap_trainer::playback::{
    AudioRoutingGraph, GestureClassifier, PlaybackController, RoutingState, Session,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    ToggleNormalization,
    Gain(f32),
    Volume(f32),
}

pub struct App {
    pub should_quit: bool,
    pub policy: GesturePolicy,
    pub session: Session<RodioSink, RodioGraph>,
}

impl App {
    pub fn new(
        config: &Config,
        catalog: Catalog,
        policy: GesturePolicy,
    ) -> Result<Self, Box<dyn Error>> {
        let (sink, events) = RodioSink::new()?;
        let graph = sink.routing_backend(config.routing);
        let routing = AudioRoutingGraph::new(
            graph,
            RoutingState {
                normalization: config.normalization,
                gain: config.gain,
            },
        );

        let mut controller = PlaybackController::new(catalog, sink, routing);
        controller.set_volume(config.volume);

        let window = match policy {
            GesturePolicy::Count => config.click_window(),
            GesturePolicy::Deferred => config.double_tap_delay(),
        };
        let classifier = GestureClassifier::new(policy, window);

        Ok(Self {
            should_quit: false,
            policy,
            session: Session::new(classifier, controller, events),
        })
    }

    pub fn tap_button(&mut self, index: usize, at: Instant) {
        let track = self
            .session
            .controller()
            .catalog()
            .tracks()
            .get(index)
            .map(|t| t.id);
        if let Some(track) = track {
            self.session.tap(track, at);
        }
    }

    pub fn perform(&mut self, action: Action) {
        let controller = self.session.controller_mut();
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleNormalization => {
                let enabled = !controller.routing_state().normalization;
                controller.set_normalization(enabled);
            }
            Action::Gain(delta) => {
                let gain = step_level(controller.routing_state().gain, delta, GAIN_MIN, GAIN_MAX);
                controller.set_gain(gain);
            }
            Action::Volume(delta) => {
                let volume = step_level(controller.volume(), delta, VOLUME_MIN, VOLUME_MAX);
                controller.set_volume(volume);
            }
        }
    }

    /// How long the loop may block on input before time-based work is due.
    fn poll_timeout(&self, now: Instant) -> Duration {
        self.session
            .classifier()
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now).min(FRAME_INTERVAL))
            .unwrap_or(FRAME_INTERVAL)
    }
}

pub fn key_action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('n') => Some(Action::ToggleNormalization),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::Gain(GAIN_STEP)),
        KeyCode::Char('-') => Some(Action::Gain(-GAIN_STEP)),
        KeyCode::Up => Some(Action::Volume(VOLUME_STEP)),
        KeyCode::Down => Some(Action::Volume(-VOLUME_STEP)),
        _ => None,
    }
}

/// UI-level clamp; rounding keeps repeated steps from drifting.
fn step_level(current: f32, delta: f32, min: f32, max: f32) -> f32 {
    (((current + delta) * 100.0).round() / 100.0).clamp(min, max)
}

pub fn run(
    config: &Config,
    catalog: Catalog,
    policy: GesturePolicy,
) -> Result<(), Box<dyn Error>> {
    init_logging(&config.log_file)?;
    info!(
        "Starting Tap Trainer with {} tracks, {policy} gestures",
        catalog.len()
    );

    let mut app = App::new(config, catalog, policy)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);
    app.session.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("Player stopped: {e}");
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        app.session.tick(Instant::now());

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(app.poll_timeout(Instant::now()))? {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(action) = key_action(key.code) {
                        app.perform(action);
                    }
                }
                Event::Mouse(mouse) => {
                    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                        let size = terminal.size()?;
                        let area = Rect::new(0, 0, size.width, size.height);
                        let count = app.session.controller().catalog().len();
                        if let Some(index) = ui::button_at(area, count, mouse.column, mouse.row) {
                            app.tap_button(index, Instant::now());
                        }
                    }
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn init_logging(log_file: &str) -> Result<(), Box<dyn Error>> {
    use simplelog::{CombinedLogger, LevelFilter, WriteLogger};
    use std::fs::File;

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        simplelog::Config::default(),
        File::create(log_file)?,
    )])?;

    Ok(())
}
