//! Action enum: what a key press asks the app to do.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    SelectDown,
    SelectUp,
    SelectFirst,
    SelectLast,

    // ── Playback ─────────────────────────────────────────────────────────────
    /// Tune into the station under the cursor.
    Activate,
    TogglePause,
    /// Fetch the selected station's song again.
    Refresh,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Self::Quit),
                _ => None,
            };
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Self::SelectDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Self::SelectUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Self::SelectFirst),
            KeyCode::Char('G') | KeyCode::End => Some(Self::SelectLast),
            KeyCode::Enter => Some(Self::Activate),
            KeyCode::Char(' ') => Some(Self::TogglePause),
            KeyCode::Char('r') => Some(Self::Refresh),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Self::Quit),
            _ => None,
        }
    }
}
