// clipsync entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the cookie jar and purge expired cookies
// 4. Create mpsc channels and the HTTP client
// 5. Spawn the report worker
// 6. Spawn the session channel task
// 7. Spawn app logic task
// 8. Run the TUI until the user quits
// 9. Cleanup: stop the session channel, let the report worker drain

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use clipsync_app::api::HttpApi;
use clipsync_app::app;
use clipsync_app::player::ClockSurface;
use clipsync_app::reporter;
use clipsync_core::config;
use clipsync_core::db;
use clipsync_core::ws_client;
use clipsync_tui::tui;

/// How long shutdown waits for each background task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("clipsync starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: server={}, session channel={}",
        config.server.base_url, config.server.ws_url
    );

    // 3. Open the cookie jar
    let db = db::Database::open(&config.database.path).context("failed to open database")?;
    info!("Database opened at {}", config.database.path);
    match db.purge_expired(Utc::now()) {
        Ok(0) => {}
        Ok(n) => info!("Purged {n} expired cookies"),
        Err(e) => warn!("Failed to purge expired cookies: {e:#}"),
    }

    // 4. Channels and HTTP client
    let (ws_tx, ws_rx) = mpsc::channel(64);
    let (playlist_tx, playlist_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let api = Arc::new(
        HttpApi::new(config.server.request_timeout()).context("failed to build HTTP client")?,
    );

    // 5. Report worker
    let (reports, reports_rx) = reporter::report_queue(config.reporter.queue_capacity);
    let worker_handle = tokio::spawn(reporter::run_report_worker(
        reports_rx,
        api.clone(),
        config.server.control_url(),
    ));

    // 6. Session channel
    let ws_url = config.server.ws_url.clone();
    let reconnect = config.reconnect.clone();
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_client::run(ws_url, reconnect, ws_tx, shutdown_rx).await {
            error!("Session channel error: {e:#}");
        }
    });

    // 7. App logic
    let app_state = app::AppState::new(
        config,
        db,
        api,
        Box::new(ClockSurface::new()),
        reports,
        playlist_tx,
    );
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, playlist_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {e:#}");
        }
    });

    // 8. TUI (blocks until the user presses 'q' or Ctrl+C)
    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {e:#}");
    }

    // 9. Cleanup. The command sender is gone, so the app loop stops and drops
    //    its report queue; the worker then drains what is left.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, app_handle).await.is_err() {
        warn!("Application loop did not stop in time");
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, worker_handle).await.is_err() {
        warn!("Report worker did not drain in time");
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, ws_handle).await.is_err() {
        warn!("Session channel did not close in time");
    }

    info!("clipsync shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("clipsync.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("clipsync_core=info,clipsync_app=info,clipsync_tui=info,clipsync=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
