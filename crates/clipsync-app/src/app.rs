// Application state and orchestration logic.
//
// The central event loop that coordinates session channel events, playlist
// fetch results, and user commands from the TUI. Owns the playlist, the
// selection and the playback reporter, and pushes UI updates to the TUI
// render loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use clipsync_core::config::Config;
use clipsync_core::db::Database;
use clipsync_core::protocol::{
    AppSnapshot, ConnectionStatus, PlaybackState, TransportEvent, UiUpdate, UserCommand,
};
use clipsync_core::session::{Cookie, SessionId};
use clipsync_core::ws_client::WsEvent;

use crate::api::{request_path, ServerApi};
use crate::player::PlaybackSurface;
use crate::playlist::{spawn_fetch, PlaylistEvent, PlaylistStore};
use crate::reporter::{PlaybackReporter, ReportQueue};
use crate::selection::Selection;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How often the playhead position is pushed to the view while playing.
pub const PROGRESS_TICK_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    /// Cookie jar.
    pub db: Database,
    pub api: Arc<dyn ServerApi>,
    /// Session id most recently received from the server (or restored from
    /// the jar). `None` until the first one arrives.
    pub session: Option<SessionId>,
    pub playlist: PlaylistStore,
    pub selection: Selection,
    pub reporter: PlaybackReporter,
    pub reports: ReportQueue,
    pub connection_status: ConnectionStatus,
    /// Spawned playlist fetches report back through a clone of this sender.
    pub playlist_tx: mpsc::Sender<PlaylistEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        api: Arc<dyn ServerApi>,
        surface: Box<dyn PlaybackSurface>,
        reports: ReportQueue,
        playlist_tx: mpsc::Sender<PlaylistEvent>,
    ) -> Self {
        AppState {
            config,
            db,
            api,
            session: None,
            playlist: PlaylistStore::new(),
            selection: Selection::new(),
            reporter: PlaybackReporter::new(surface),
            reports,
            connection_status: ConnectionStatus::Disconnected,
            playlist_tx,
        }
    }

    // -- Session --

    /// Pick up an unexpired session cookie left by a previous run. Returns
    /// true when one was found.
    pub fn restore_session(&mut self, now: DateTime<Utc>) -> bool {
        let session = &self.config.session;
        match self.db.cookie(&session.cookie_name, &session.cookie_path, now) {
            Ok(Some(cookie)) => {
                info!("Restored session from cookie jar (expires {})", cookie.expires_at());
                self.session = Some(SessionId::new(cookie.value));
                true
            }
            Ok(None) => {
                debug!("No stored session cookie");
                false
            }
            Err(e) => {
                warn!("Failed to read session cookie: {e:#}");
                false
            }
        }
    }

    /// Adopt a session id announced by the server and persist it as a
    /// cookie. A newer id replaces the old one.
    pub fn establish_session(&mut self, id: SessionId, now: DateTime<Utc>) {
        let cookie = Cookie::session(&id, &self.config.session, now);
        info!(
            "Session established: cookie {} path={} max-age={}s",
            cookie.name, cookie.path, cookie.max_age_secs
        );
        if let Err(e) = self.db.set_cookie(&cookie) {
            warn!("Failed to persist session cookie: {e:#}");
        }
        self.session = Some(id);
    }

    /// `Cookie` header value for a request to `url`.
    ///
    /// Falls back to the in-memory session if the jar cannot be read.
    pub fn cookie_header_for(&self, url: &str) -> Option<String> {
        let now = Utc::now();
        match self.db.cookie_header(request_path(url), now) {
            Ok(header) => header,
            Err(e) => {
                warn!("Failed to read cookie jar: {e:#}");
                self.session
                    .as_ref()
                    .map(|id| Cookie::session(id, &self.config.session, now).header_pair())
            }
        }
    }

    // -- Playlist --

    /// Point the playlist at the configured endpoint, fetching if the url
    /// changed.
    pub fn load_playlist(&mut self) {
        let url = self.config.server.playlist_url();
        if let Some(generation) = self.playlist.set_url(&url) {
            self.spawn_playlist_fetch(url, generation);
        }
    }

    pub fn refresh_playlist(&mut self) {
        let Some(generation) = self.playlist.refresh() else {
            return;
        };
        if let Some(url) = self.playlist.url().map(str::to_string) {
            info!("Refreshing playlist");
            self.spawn_playlist_fetch(url, generation);
        }
    }

    fn spawn_playlist_fetch(&self, url: String, generation: u64) {
        let cookie = self.cookie_header_for(&url);
        spawn_fetch(
            Arc::clone(&self.api),
            url,
            cookie,
            generation,
            self.playlist_tx.clone(),
        );
    }

    /// Apply a fetch result, then re-run the selection policy. Returns true
    /// when anything visible changed.
    pub fn handle_playlist_event(&mut self, event: PlaylistEvent) -> bool {
        if !self.playlist.apply(event) {
            return false;
        }
        self.selection
            .apply_policy(self.playlist.videos(), self.config.selection.on_stale);
        self.sync_target();
        true
    }

    // -- Selection and playback --

    pub fn select_row(&mut self, index: usize) -> bool {
        if !self.selection.select_row(index, self.playlist.videos()) {
            return false;
        }
        self.sync_target();
        true
    }

    /// Point the reporter at the current selection.
    fn sync_target(&mut self) {
        self.reporter.set_target(self.selection.current());
    }

    pub fn play(&mut self) -> bool {
        let event = self.reporter.play();
        self.report(event)
    }

    pub fn pause(&mut self) -> bool {
        let event = self.reporter.pause();
        self.report(event)
    }

    pub fn toggle_playback(&mut self) -> bool {
        let event = self.reporter.toggle();
        self.report(event)
    }

    fn report(&mut self, event: Option<TransportEvent>) -> bool {
        let Some(event) = event else {
            return false;
        };
        info!("{} {} at {:.3}s", event.action, event.video_name, event.time);
        let cookie = self.cookie_header_for(&self.config.server.control_url());
        self.reports.enqueue(event, cookie);
        true
    }

    pub fn build_snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            playlist: self.playlist.videos().to_vec(),
            selection: self.selection.current().cloned(),
            playback: self.reporter.state(),
            position: self.reporter.position(),
            connection: self.connection_status,
            has_session: self.session.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Restores any stored session, issues the first playlist fetch, then listens
/// using `tokio::select!` on:
/// 1. Session channel events
/// 2. Playlist fetch results
/// 3. User commands from the TUI
/// 4. A progress tick that pushes the playhead while playing
///
/// Stops on `Quit` or when the command channel closes. Dropping the state on
/// exit closes the report queue, letting the report worker drain.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut playlist_rx: mpsc::Receiver<PlaylistEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    state.restore_session(Utc::now());
    state.load_playlist();
    push_snapshot(&state, &ui_tx).await;

    // The session channel gives up when reconnects are exhausted; keep
    // serving the UI without it.
    let mut ws_open = true;
    let mut playlist_open = true;

    let mut progress = tokio::time::interval(PROGRESS_TICK_INTERVAL);
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // --- Session channel events ---
            ws_event = ws_rx.recv(), if ws_open => {
                match ws_event {
                    Some(event) => handle_ws_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Session channel closed");
                        ws_open = false;
                    }
                }
            }

            // --- Playlist fetch results ---
            result = playlist_rx.recv(), if playlist_open => {
                match result {
                    Some(event) => {
                        if state.handle_playlist_event(event) {
                            push_snapshot(&state, &ui_tx).await;
                        }
                    }
                    None => {
                        info!("Playlist channel closed");
                        playlist_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        if handle_user_command(&mut state, cmd) {
                            push_snapshot(&state, &ui_tx).await;
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Playhead progress ---
            _ = progress.tick() => {
                if state.reporter.state() == PlaybackState::Playing {
                    let _ = ui_tx.send(UiUpdate::Position(state.reporter.position())).await;
                }
            }
        }
    }

    info!("Application event loop stopped");
    Ok(())
}

async fn handle_ws_event(state: &mut AppState, event: WsEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        WsEvent::Connected { url } => {
            info!("Session channel connected to {url}");
            set_connection_status(state, ConnectionStatus::Connected, ui_tx).await;
        }
        WsEvent::Disconnected => {
            info!("Session channel disconnected");
            set_connection_status(state, ConnectionStatus::Disconnected, ui_tx).await;
        }
        WsEvent::Reconnecting { attempt, delay } => {
            info!("Reconnecting to session channel (attempt {attempt}, in {delay:?})");
            set_connection_status(state, ConnectionStatus::Reconnecting { attempt }, ui_tx).await;
        }
        WsEvent::SessionEstablished(id) => {
            state.establish_session(id, Utc::now());
            push_snapshot(state, ui_tx).await;
        }
    }
}

async fn set_connection_status(
    state: &mut AppState,
    status: ConnectionStatus,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    state.connection_status = status;
    let _ = ui_tx.send(UiUpdate::ConnectionStatus(status)).await;
}

/// Apply a user command. Returns true when the view needs a fresh snapshot.
fn handle_user_command(state: &mut AppState, cmd: UserCommand) -> bool {
    match cmd {
        UserCommand::SelectRow(index) => state.select_row(index),
        UserCommand::TogglePlayback => state.toggle_playback(),
        UserCommand::Play => state.play(),
        UserCommand::Pause => state.pause(),
        UserCommand::Seek(delta) => state.reporter.seek_by(delta),
        UserCommand::RefreshPlaylist => {
            state.refresh_playlist();
            false
        }
        // Handled by the event loop.
        UserCommand::Quit => false,
    }
}

async fn push_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let snapshot = state.build_snapshot();
    let _ = ui_tx.send(UiUpdate::StateSnapshot(Box::new(snapshot))).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
