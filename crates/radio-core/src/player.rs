//! External player driver.
//!
//! The player (VLC with its `rc` interface by default) runs as a child
//! process for the whole session.  We talk to it by writing one command per
//! line to its stdin:
//!
//! ```text
//!   clear            drop the current playlist
//!   add <address>    enqueue a stream
//!   play             start / resume
//!   stop             stop, keep the process alive
//! ```
//!
//! Nothing is read back.  [`PlayerController::is_playing`] is the last
//! commanded state, not something the player confirmed; a stream that fails
//! to connect still reads as playing.
//!
//! Phases: `Idle` (only inside [`PlayerController::start`]) → `Playing` ⇄
//! `Stopped` → `Quit`.  Once quit, every command fails with
//! [`PlayerError::ProcessExited`].

use std::fmt;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, error, info};

use crate::config::PlayerConfig;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("cannot start player {program:?}: {source}")]
    Startup {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("player command channel broken: {0}")]
    Transport(#[source] std::io::Error),

    #[error("player process has exited")]
    ProcessExited,

    #[error("player command channel is closed after an earlier write failure")]
    Disconnected,

    #[error("stream address contains a line break: {0:?}")]
    InvalidAddress(String),

    #[error("player exited with {0}")]
    Exit(ExitStatus),

    #[error("cannot wait for player: {0}")]
    Wait(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Idle,
    Playing,
    Stopped,
    Quit,
}

/// One line of the player's stdin protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand<'a> {
    Clear,
    Add(&'a str),
    Play,
    Stop,
}

impl fmt::Display for PlayerCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => f.write_str("clear"),
            Self::Add(address) => write!(f, "add {}", address),
            Self::Play => f.write_str("play"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Owns the player process and its stdin for the whole session.
pub struct PlayerController {
    child: Child,
    stdin: Option<ChildStdin>,
    phase: PlayerPhase,
    broken: bool,
}

impl PlayerController {
    /// Spawn the player and start `stream` on it.
    pub async fn start(config: &PlayerConfig, stream: &str) -> Result<Self, PlayerError> {
        info!("player: spawning {} {:?}", config.program, config.args);
        let startup = |source| PlayerError::Startup {
            program: config.program.clone(),
            source,
        };

        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(startup)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            startup(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin was not captured",
            ))
        })?;
        info!("player: running with PID {:?}", child.id());

        let mut player = Self {
            child,
            stdin: Some(stdin),
            phase: PlayerPhase::Idle,
            broken: false,
        };
        player.play(stream).await?;
        Ok(player)
    }

    /// Replace whatever is queued with `stream` and play it.
    pub async fn play(&mut self, stream: &str) -> Result<(), PlayerError> {
        if stream.contains(|c: char| c == '\n' || c == '\r') {
            return Err(PlayerError::InvalidAddress(stream.to_string()));
        }
        info!("player: play {}", stream);
        self.send(PlayerCommand::Clear).await?;
        self.send(PlayerCommand::Add(stream)).await?;
        self.resume().await
    }

    pub async fn resume(&mut self) -> Result<(), PlayerError> {
        self.ensure_running()?;
        self.send(PlayerCommand::Play).await?;
        self.phase = PlayerPhase::Playing;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Stop).await?;
        self.phase = PlayerPhase::Stopped;
        Ok(())
    }

    /// Close stdin and wait for the player to exit.  There is no timeout.
    pub async fn quit(&mut self) -> Result<(), PlayerError> {
        if self.phase == PlayerPhase::Quit {
            return Err(PlayerError::ProcessExited);
        }
        self.phase = PlayerPhase::Quit;
        drop(self.stdin.take());

        info!("player: waiting for exit");
        let status = self.child.wait().await.map_err(PlayerError::Wait)?;
        if status.success() {
            info!("player: exited");
            Ok(())
        } else {
            error!("player: exited with {}", status);
            Err(PlayerError::Exit(status))
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    /// OS process id; `None` once the player has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn ensure_running(&mut self) -> Result<(), PlayerError> {
        if self.phase == PlayerPhase::Quit {
            return Err(PlayerError::ProcessExited);
        }
        match self.child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                error!("player: process already exited with {}", status);
                Err(PlayerError::ProcessExited)
            }
            Err(e) => Err(PlayerError::Wait(e)),
        }
    }

    async fn send(&mut self, command: PlayerCommand<'_>) -> Result<(), PlayerError> {
        if self.phase == PlayerPhase::Quit {
            return Err(PlayerError::ProcessExited);
        }
        if self.broken {
            return Err(PlayerError::Disconnected);
        }
        let stdin = self.stdin.as_mut().ok_or(PlayerError::ProcessExited)?;

        debug!("player: > {}", command);
        let line = format!("{}\n", command);
        let result = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("player: write of {:?} failed: {}", line.trim_end(), e);
            self.broken = true;
            return Err(PlayerError::Transport(e));
        }
        Ok(())
    }
}
