//! Rendering: station list on the left, now-playing panel on the right,
//! key hints (or the last player error) on the bottom line.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use radio_core::station::Station;

use crate::app_state::UiState;
use crate::theme::{
    style_border, style_cursor, style_default, style_muted, style_on_air, style_playing,
    style_secondary, C_CONNECTING, C_ERROR,
};

const KEY_HINTS: &str = "j/k move  g/G first/last  enter tune  space stop/play  r refresh  q quit";

pub fn draw(frame: &mut Frame, stations: &[Station], state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let width = list_width(stations);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(width), Constraint::Min(20)])
        .split(rows[0]);

    draw_stations(frame, cols[0], stations, state);
    draw_now_playing(frame, cols[1], state);
    draw_status(frame, rows[1], state);
}

/// Widest name plus marker and borders, clamped to fit a `u16`.
fn list_width(stations: &[Station]) -> u16 {
    let widest = stations
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    u16::try_from(widest).unwrap_or(u16::MAX).saturating_add(6)
}

fn draw_stations(frame: &mut Frame, area: Rect, stations: &[Station], state: &UiState) {
    let lines: Vec<Line> = stations
        .iter()
        .enumerate()
        .map(|(idx, station)| {
            let marker = if idx == state.cursor { ">" } else { " " };
            let name_style = if idx == state.selected {
                style_on_air()
            } else {
                style_default()
            };
            let line = Line::from(vec![
                Span::styled(format!("{} ", marker), style_secondary()),
                Span::styled(station.name.clone(), name_style),
            ]);
            if idx == state.cursor {
                line.style(style_cursor())
            } else {
                line
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border())
        .title(" stations ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_now_playing(frame: &mut Frame, area: Rect, state: &UiState) {
    let (icon, icon_style) = if state.is_playing {
        ("▶ playing", style_playing())
    } else {
        ("■ stopped", style_muted())
    };

    let song = &state.song;
    let (title, detail, title_style) = if song.is_loading {
        (
            "Loading".to_string(),
            String::new(),
            Style::default().fg(C_CONNECTING),
        )
    } else if let Some(err) = &song.error {
        ("Error".to_string(), err.clone(), Style::default().fg(C_ERROR))
    } else if song.data.title.is_empty() {
        (
            "Unknown".to_string(),
            "No song data".to_string(),
            style_secondary(),
        )
    } else {
        (
            song.data.title.clone(),
            song.data.artist.clone(),
            style_default(),
        )
    };

    let mut lines = vec![
        Line::from(Span::styled(icon, icon_style)),
        Line::from(""),
        Line::from(Span::styled(title, title_style.add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(detail, style_secondary())),
    ];
    if let (Some(at), false) = (song.fetched_at, song.is_loading) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("updated {}", at.format("%H:%M:%S")),
            style_muted(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border())
        .title(" now playing ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Vertically centre the text block.
    let pad = inner.height.saturating_sub(lines.len() as u16) / 2;
    let body = Rect {
        y: inner.y + pad,
        height: inner.height - pad,
        ..inner
    };
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), body);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &UiState) {
    let line = match &state.player_error {
        Some(err) => Line::from(Span::styled(
            format!(" player error: {}", err),
            Style::default().fg(C_ERROR),
        )),
        None => Line::from(Span::styled(format!(" {}", KEY_HINTS), style_muted())),
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use radio_core::song::Song;
    use radio_core::station::Station;

    fn render(state: &UiState) -> String {
        let stations = vec![
            Station::new("Christian Rock", "http://a/"),
            Station::new("Gospel FM", "http://b/"),
        ];
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|f| draw(f, &stations, state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_list_width_clamps_long_names() {
        let stations = vec![Station::new("x".repeat(70_000), "http://a/")];
        assert_eq!(list_width(&stations), u16::MAX);
        assert_eq!(list_width(&[Station::new("Melodia", "http://b/")]), 13);
        assert_eq!(list_width(&[]), 6);
    }

    #[test]
    fn test_loading_view() {
        let state = UiState::new(2);
        let screen = render(&state);
        assert!(screen.contains("Christian Rock"));
        assert!(screen.contains("Gospel FM"));
        assert!(screen.contains("Loading"));
        assert!(screen.contains("q quit"));
    }

    #[test]
    fn test_song_view() {
        let mut state = UiState::new(2);
        state.is_playing = true;
        let ticket = state.refresh();
        state.apply_fetch(ticket, Ok(Song::new("Oceans", "Hillsong United")));
        let screen = render(&state);
        assert!(screen.contains("playing"));
        assert!(screen.contains("Oceans"));
        assert!(screen.contains("Hillsong United"));
        assert!(screen.contains("updated"));
    }

    #[test]
    fn test_empty_song_view() {
        let mut state = UiState::new(2);
        let ticket = state.refresh();
        state.apply_fetch(ticket, Ok(Song::default()));
        let screen = render(&state);
        assert!(screen.contains("Unknown"));
        assert!(screen.contains("No song data"));
        assert!(screen.contains("stopped"));
    }

    #[test]
    fn test_player_error_replaces_key_hints() {
        let mut state = UiState::new(2);
        state.player_error = Some("player process has exited".to_string());
        let screen = render(&state);
        assert!(screen.contains("player error: player process has exited"));
        assert!(!screen.contains("q quit"));
    }
}
