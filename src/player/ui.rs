use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::app::App;
use tap_trainer::constants::GRID_COLUMNS;
use tap_trainer::playback::PlaybackError;

struct Areas {
    title: Rect,
    grid: Rect,
    status: Rect,
    help: Rect,
}

fn split(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Min(6),    // Track grid
            Constraint::Length(3), // Status
            Constraint::Length(2), // Help
        ])
        .split(area);

    Areas {
        title: chunks[0],
        grid: chunks[1],
        status: chunks[2],
        help: chunks[3],
    }
}

/// Button rectangles for `count` tracks, row by row.
pub fn track_buttons(grid: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let rows = count.div_ceil(GRID_COLUMNS) as u32;
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints((0..rows).map(|_| Constraint::Ratio(1, rows)).collect::<Vec<_>>())
        .split(grid);

    row_areas
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(
                    (0..GRID_COLUMNS)
                        .map(|_| Constraint::Ratio(1, GRID_COLUMNS as u32))
                        .collect::<Vec<_>>(),
                )
                .split(*row)
                .to_vec()
        })
        .take(count)
        .collect()
}

/// Index of the track button under a terminal cell, if any.
pub fn button_at(area: Rect, count: usize, column: u16, row: u16) -> Option<usize> {
    let grid = split(area).grid;
    track_buttons(grid, count).iter().position(|button| {
        column >= button.x
            && column < button.x + button.width
            && row >= button.y
            && row < button.y + button.height
    })
}

pub fn draw(f: &mut Frame, app: &App) {
    let areas = split(f.area());

    let title = Paragraph::new("🎵 Tap Trainer")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, areas.title);

    draw_grid(f, areas.grid, app);
    draw_status(f, areas.status, app);
    draw_help(f, areas.help, app);
}

fn draw_grid(f: &mut Frame, area: Rect, app: &App) {
    let controller = app.session.controller();
    let state = controller.state();
    let tracks = controller.catalog().tracks();

    for (track, rect) in tracks.iter().zip(track_buttons(area, tracks.len())) {
        let active = state.current_track == Some(track.id) && state.is_playing;
        let current = state.current_track == Some(track.id);

        let border_style = if active {
            Style::default().fg(Color::LightCyan)
        } else if current {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let lines = vec![
            Line::from(Span::styled(
                track.label.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("#{}", track.id),
                Style::default().fg(Color::Gray),
            )),
        ];

        let button = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style),
            );
        f.render_widget(button, rect);
    }
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let controller = app.session.controller();
    let state = controller.state();
    let routing = controller.routing_state();

    let (playback, playback_color) = if state.is_playing {
        ("▶ Playing", Color::Green)
    } else {
        ("⏸ Stopped", Color::Yellow)
    };

    let normalization = if controller.routing_degraded() {
        Span::styled("Normalize: n/a", Style::default().fg(Color::DarkGray))
    } else if routing.normalization {
        Span::styled("Normalize: ON", Style::default().fg(Color::Green))
    } else {
        Span::styled("Normalize: off", Style::default().fg(Color::Gray))
    };

    let mut spans = vec![
        Span::styled(playback, Style::default().fg(playback_color)),
        Span::raw("  │  "),
        normalization,
        Span::raw(format!("  │  Gain: {:.1}", routing.gain)),
        Span::raw(format!("  │  Volume: {:.0}%", controller.volume() * 100.0)),
    ];

    if let Some(error) = controller.last_error() {
        let message = match error {
            PlaybackError::PlaybackRejected { track, .. } => {
                format!("  │  Track {track} could not start, tap to retry")
            }
            other => format!("  │  {other}"),
        };
        spans.push(Span::styled(message, Style::default().fg(Color::Red)));
    }

    let status = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

fn draw_help(f: &mut Frame, area: Rect, app: &App) {
    let gestures = match app.policy {
        tap_trainer::config::GesturePolicy::Count => "1 click: play · 2 clicks: pause · 3 clicks: restart",
        tap_trainer::config::GesturePolicy::Deferred => "1 click: play/pause · 2 clicks: restart",
    };
    let help = Paragraph::new(vec![
        Line::from(Span::styled(gestures, Style::default().fg(Color::Gray))),
        Line::from(Span::styled(
            "[n] normalize  [+/-] gain  [↑/↓] volume  [q] quit",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(help, area);
}
