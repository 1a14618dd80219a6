mod action;
mod app;
mod app_state;
mod theme;
mod ui;

use anyhow::Context;

use radio_core::config::Config;
use radio_core::player::PlayerController;
use radio_core::station;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load()
        .with_context(|| format!("loading {}", Config::config_path().display()))?;

    // ── Logging ──────────────────────────────────────────────────────────────
    let log_path = &config.log.file;
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    // RUST_LOG wins over the configured filter.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log.filter.clone());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("tunein log: {}", log_path.display());
    tracing::info!("tunein starting…");

    // ── Stations ─────────────────────────────────────────────────────────────
    let stations = station::load_stations(&config).with_context(|| {
        format!(
            "loading stations from {}",
            config.stations.stations_toml.display()
        )
    })?;
    tracing::info!("{} stations loaded", stations.len());

    // ── Player ───────────────────────────────────────────────────────────────
    let first = stations.first().context("station list is empty")?;
    let player = PlayerController::start(&config.player, &first.stream)
        .await
        .context("starting the player")?;

    // ── Run TUI ──────────────────────────────────────────────────────────────
    app::App::new(stations, player).run().await?;

    tracing::info!("tunein exited");
    Ok(())
}
