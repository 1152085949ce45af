// TUI: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the parts of the application state
// it draws. The app orchestrator pushes `UiUpdate` messages over an mpsc
// channel; the TUI applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{info, warn};

use clipsync_core::protocol::{
    AppSnapshot, ConnectionStatus, PlaybackState, UiUpdate, UserCommand, Video,
};

use layout::{build_layout, AppLayout};

/// Interval between redraws (~30 fps).
pub const RENDER_INTERVAL: Duration = Duration::from_millis(33);

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated via `UiUpdate` messages from the app orchestrator. The cursor is
/// the only field the TUI owns itself.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub playlist: Vec<Video>,
    pub selection: Option<Video>,
    pub playback: PlaybackState,
    /// Playhead in seconds.
    pub position: f64,
    pub connection_status: ConnectionStatus,
    pub has_session: bool,
    /// Highlighted playlist row.
    pub cursor: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            playlist: Vec::new(),
            selection: None,
            playback: PlaybackState::Stopped,
            position: 0.0,
            connection_status: ConnectionStatus::Disconnected,
            has_session: false,
            cursor: 0,
        }
    }
}

impl ViewState {
    /// Apply a full state snapshot from the app orchestrator.
    ///
    /// The cursor is kept where it was, clamped to the new playlist.
    pub fn apply_snapshot(&mut self, snapshot: AppSnapshot) {
        self.playlist = snapshot.playlist;
        self.selection = snapshot.selection;
        self.playback = snapshot.playback;
        self.position = snapshot.position;
        self.connection_status = snapshot.connection;
        self.has_session = snapshot.has_session;
        self.cursor = self.cursor.min(self.playlist.len().saturating_sub(1));
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.playlist.len() {
            self.cursor += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::StateSnapshot(snapshot) => {
            state.apply_snapshot(*snapshot);
        }
        UiUpdate::Position(position) => {
            state.position = position;
        }
        UiUpdate::ConnectionStatus(status) => {
            state.connection_status = status;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::playlist::render(frame, layout.playlist, state);
    widgets::player::render(frame, layout.player, state);
    widgets::placeholder::render(frame, layout.speech, "Speech to Text", "Speech to Text");
    widgets::placeholder::render(frame, layout.prompts, "Prompts", "Prompt generations");
    widgets::placeholder::render(frame, layout.responses, "Responses", "LLM response generations");
    render_help_bar(frame, &layout);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout) {
    let text = " ↑↓:Move | Enter:Select | Space:Play/Pause | ←→:Seek | r:Refresh | q:Quit";
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(RENDER_INTERVAL);
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            // UI updates from the app orchestrator
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => {
                        info!("UI channel closed, leaving TUI");
                        break Ok(());
                    }
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Terminal input error: {e}");
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn v(name: &str) -> Video {
        Video::new(format!("http://h/videos/{name}"), name)
    }

    fn snapshot(names: &[&str], selection: Option<&str>) -> AppSnapshot {
        AppSnapshot {
            playlist: names.iter().map(|n| v(n)).collect(),
            selection: selection.map(v),
            playback: PlaybackState::Paused,
            position: 3.0,
            connection: ConnectionStatus::Connected,
            has_session: true,
        }
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.playlist.is_empty());
        assert!(state.selection.is_none());
        assert_eq!(state.playback, PlaybackState::Stopped);
        assert_eq!(state.position, 0.0);
        assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
        assert!(!state.has_session);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn apply_snapshot_updates_fields() {
        let mut state = ViewState::default();
        state.apply_snapshot(snapshot(&["A", "B"], Some("B")));
        assert_eq!(state.playlist, vec![v("A"), v("B")]);
        assert_eq!(state.selection, Some(v("B")));
        assert_eq!(state.playback, PlaybackState::Paused);
        assert_eq!(state.position, 3.0);
        assert_eq!(state.connection_status, ConnectionStatus::Connected);
        assert!(state.has_session);
    }

    #[test]
    fn apply_snapshot_clamps_cursor() {
        let mut state = ViewState::default();
        state.apply_snapshot(snapshot(&["A", "B", "C"], Some("A")));
        state.cursor = 2;
        state.apply_snapshot(snapshot(&["A"], Some("A")));
        assert_eq!(state.cursor, 0);

        state.apply_snapshot(snapshot(&[], Some("A")));
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn apply_ui_update_position_and_connection() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Position(42.0));
        assert_eq!(state.position, 42.0);
        apply_ui_update(
            &mut state,
            UiUpdate::ConnectionStatus(ConnectionStatus::Reconnecting { attempt: 2 }),
        );
        assert_eq!(
            state.connection_status,
            ConnectionStatus::Reconnecting { attempt: 2 }
        );
    }

    #[test]
    fn apply_ui_update_state_snapshot() {
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::StateSnapshot(Box::new(snapshot(&["A"], Some("A")))),
        );
        assert_eq!(state.selection, Some(v("A")));
    }

    #[test]
    fn render_frame_smoke() {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut state = ViewState::default();
        state.apply_snapshot(snapshot(&["A", "B"], Some("A")));
        terminal
            .draw(|frame| render_frame(frame, &state))
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Playlist"));
        assert!(text.contains("Player"));
        assert!(text.contains("Speech to Text"));
        assert!(text.contains("Connected"));
    }
}
