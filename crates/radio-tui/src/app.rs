//! App: the event loop.
//!
//! Architecture:
//! - `App` owns the station list, the `PlayerController` and `UiState`.
//! - A `tokio::mpsc` channel carries `AppMessage`s in: terminal events from a
//!   blocking reader thread, finished metadata fetches from fetch tasks.
//! - The loop draws a frame, then awaits the next message.  Only this loop
//!   mutates `UiState`.
//! - Player commands are awaited inline; fetches run as their own tasks and
//!   report back tagged with a `FetchTicket`.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use radio_core::player::{PlayerController, PlayerError};
use radio_core::song::Song;
use radio_core::station::{FetchError, Station};

use crate::action::Action;
use crate::app_state::{FetchTicket, UiState};
use crate::ui;

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

/// Messages into the event loop.
#[derive(Debug)]
pub enum AppMessage {
    Event(Event),
    SongFetched {
        ticket: FetchTicket,
        result: Result<Song, FetchError>,
    },
}

pub struct App {
    stations: Vec<Station>,
    player: PlayerController,
    client: reqwest::Client,
    state: UiState,
    should_quit: bool,
    quit_result: Option<Result<(), PlayerError>>,
}

impl App {
    /// `player` must already be playing `stations[0]`.
    pub fn new(stations: Vec<Station>, player: PlayerController) -> Self {
        let mut state = UiState::new(stations.len());
        state.is_playing = player.is_playing();
        Self {
            stations,
            player,
            client: reqwest::Client::new(),
            state,
            should_quit: false,
            quit_result: None,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.event_loop(&mut terminal).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result?;
        match self.quit_result.take() {
            Some(Err(e)) => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn event_loop(&mut self, terminal: &mut Tui) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ─────────────────────────────────
        // Polls so the thread notices the loop is gone and exits.
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            if event_tx.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        let ticket = self.state.refresh();
        self.spawn_fetch(ticket, &tx);

        loop {
            terminal.draw(|f| ui::draw(f, &self.stations, &self.state))?;

            if self.should_quit {
                break;
            }

            match rx.recv().await {
                Some(msg) => self.handle_message(msg, &tx).await,
                None => break,
            }
        }
        Ok(())
    }

    // ── Message handler ───────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage, tx: &mpsc::Sender<AppMessage>) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if let Some(action) = Action::from_key(key) {
                    self.apply_action(action, tx).await;
                }
            }
            AppMessage::Event(_) => {}
            AppMessage::SongFetched { ticket, result } => {
                if !self.state.apply_fetch(ticket, result) {
                    warn!(
                        "[fetch] dropping stale result for station {} (gen {})",
                        ticket.station, ticket.generation
                    );
                }
            }
        }
    }

    async fn apply_action(&mut self, action: Action, tx: &mpsc::Sender<AppMessage>) {
        match action {
            Action::SelectDown => self.state.select_down(),
            Action::SelectUp => self.state.select_up(),
            Action::SelectFirst => self.state.select_first(),
            Action::SelectLast => self.state.select_last(),

            Action::Activate => {
                let ticket = self.state.activate();
                let station = &self.stations[ticket.station];
                info!("tuning into {}", station.name);
                let result = self.player.play(&station.stream).await;
                self.record_player(result);
                self.spawn_fetch(ticket, tx);
            }
            Action::TogglePause => {
                let result = if self.player.is_playing() {
                    self.player.stop().await
                } else {
                    self.player.resume().await
                };
                self.record_player(result);
            }
            Action::Refresh => {
                let ticket = self.state.refresh();
                self.spawn_fetch(ticket, tx);
            }
            Action::Quit => {
                info!("quit requested");
                self.quit_result = Some(self.player.quit().await);
                self.state.is_playing = false;
                self.should_quit = true;
            }
        }
    }

    fn record_player(&mut self, result: Result<(), PlayerError>) {
        match result {
            Ok(()) => self.state.player_error = None,
            Err(e) => {
                error!("player: {}", e);
                self.state.player_error = Some(e.to_string());
            }
        }
        self.state.is_playing = self.player.is_playing();
    }

    fn spawn_fetch(&self, ticket: FetchTicket, tx: &mpsc::Sender<AppMessage>) {
        let station = self.stations[ticket.station].clone();
        let client = self.client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = station.fetch_current_song(&client).await;
            match &result {
                Ok(song) => debug!("[fetch] {}: {:?}", station.name, song),
                Err(e) => warn!("[fetch] {}: {}", station.name, e),
            }
            let _ = tx.send(AppMessage::SongFetched { ticket, result }).await;
        });
    }
}
