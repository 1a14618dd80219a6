//! UiState: everything the screen shows, mutated only by the App event loop.
//!
//! `cursor` walks the station list; `selected` is the station on air and
//! changes only when the cursor's station is activated.

use chrono::{DateTime, Local};
use radio_core::song::Song;
use radio_core::station::FetchError;

/// State of the now-playing panel.
#[derive(Debug, Clone, Default)]
pub struct SongView {
    pub is_loading: bool,
    pub error: Option<String>,
    pub data: Song,
    pub fetched_at: Option<DateTime<Local>>,
}

impl SongView {
    fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }
}

/// Identifies one metadata fetch.  A result is only shown if its ticket is
/// still the latest one issued for the selected station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub station: usize,
    pub generation: u64,
}

#[derive(Debug)]
pub struct UiState {
    station_count: usize,
    pub cursor: usize,
    pub selected: usize,
    pub song: SongView,
    /// Mirrors `PlayerController::is_playing` after every command.
    pub is_playing: bool,
    /// Last failed player command, cleared by the next successful one.
    pub player_error: Option<String>,
    generation: u64,
}

impl UiState {
    /// Station 0 selected and its song loading, as at startup.
    pub fn new(station_count: usize) -> Self {
        Self {
            station_count,
            cursor: 0,
            selected: 0,
            song: SongView::loading(),
            is_playing: false,
            player_error: None,
            generation: 0,
        }
    }

    pub fn select_down(&mut self) {
        if self.station_count == 0 {
            return;
        }
        self.cursor = (self.cursor + 1) % self.station_count;
    }

    pub fn select_up(&mut self) {
        if self.station_count == 0 {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.station_count - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn select_first(&mut self) {
        self.cursor = 0;
    }

    pub fn select_last(&mut self) {
        self.cursor = self.station_count.saturating_sub(1);
    }

    /// Put the cursor's station on air.  Returns the fetch to run for it.
    pub fn activate(&mut self) -> FetchTicket {
        self.selected = self.cursor;
        self.issue_fetch()
    }

    /// Re-fetch the selected station without touching playback.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue_fetch()
    }

    /// Apply a finished fetch.  Returns `false` (and changes nothing) when
    /// the result is stale: another station was selected meanwhile or a
    /// newer fetch was issued.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<Song, FetchError>) -> bool {
        if ticket.station != self.selected || ticket.generation != self.generation {
            return false;
        }
        self.song = match result {
            Ok(song) => SongView {
                is_loading: false,
                error: None,
                data: song,
                fetched_at: Some(Local::now()),
            },
            Err(e) => SongView {
                is_loading: false,
                error: Some(e.to_string()),
                ..SongView::default()
            },
        };
        true
    }

    fn issue_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.song = SongView::loading();
        FetchTicket {
            station: self.selected,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radio_core::song::DecodeError;

    fn decode_error() -> FetchError {
        FetchError::Decode(DecodeError::MissingTokens {
            track: "Ao Vivo".to_string(),
        })
    }

    #[test]
    fn test_cursor_wraps() {
        let mut s = UiState::new(3);
        s.select_up();
        assert_eq!(s.cursor, 2);
        s.select_down();
        assert_eq!(s.cursor, 0);
        s.select_down();
        s.select_down();
        s.select_down();
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn test_first_last() {
        let mut s = UiState::new(5);
        s.select_last();
        assert_eq!(s.cursor, 4);
        s.select_first();
        assert_eq!(s.cursor, 0);
    }

    #[test]
    fn test_cursor_does_not_change_selection() {
        let mut s = UiState::new(5);
        s.select_down();
        s.select_down();
        assert_eq!(s.cursor, 2);
        assert_eq!(s.selected, 0);

        let ticket = s.activate();
        assert_eq!(s.selected, 2);
        assert_eq!(ticket.station, 2);
        assert!(s.song.is_loading);
    }

    #[test]
    fn test_fetch_result_applied() {
        let mut s = UiState::new(2);
        let ticket = s.refresh();
        assert!(s.apply_fetch(ticket, Ok(Song::new("Oceans", "Hillsong United"))));
        assert!(!s.song.is_loading);
        assert!(s.song.error.is_none());
        assert_eq!(s.song.data.title, "Oceans");
        assert!(s.song.fetched_at.is_some());
    }

    #[test]
    fn test_fetch_error_shown() {
        let mut s = UiState::new(2);
        let ticket = s.refresh();
        assert!(s.apply_fetch(ticket, Err(decode_error())));
        assert!(!s.song.is_loading);
        assert!(s.song.error.as_deref().unwrap().contains("Ao Vivo"));
        assert!(s.song.data.is_empty());
    }

    #[test]
    fn test_result_for_previous_station_is_discarded() {
        let mut s = UiState::new(3);
        let old = s.refresh();

        s.select_down();
        let new = s.activate();

        assert!(!s.apply_fetch(old, Ok(Song::new("Stale", "Old Station"))));
        assert!(s.song.is_loading);

        assert!(s.apply_fetch(new, Ok(Song::new("Fresh", "New Station"))));
        assert_eq!(s.song.data.title, "Fresh");
    }

    #[test]
    fn test_older_refresh_of_same_station_is_discarded() {
        let mut s = UiState::new(1);
        let first = s.refresh();
        let second = s.refresh();
        assert_eq!(first.station, second.station);

        assert!(s.apply_fetch(second, Ok(Song::new("Newer", "A"))));
        assert!(!s.apply_fetch(first, Err(decode_error())));
        assert_eq!(s.song.data.title, "Newer");
        assert!(s.song.error.is_none());
    }

    #[test]
    fn test_reactivating_same_station_discards_older_fetch() {
        let mut s = UiState::new(3);
        let first = s.activate();
        let second = s.activate();
        assert!(!s.apply_fetch(first, Ok(Song::default())));
        assert!(s.apply_fetch(second, Ok(Song::default())));
    }
}
