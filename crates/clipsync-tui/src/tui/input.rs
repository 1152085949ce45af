// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (cursor movement).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use clipsync_core::protocol::UserCommand;

use super::ViewState;

/// Seconds moved by one press of the left/right arrow.
pub const SEEK_STEP_SECS: f64 = 5.0;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when the key press was handled locally or
/// ignored.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.cursor_up();
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.cursor_down();
            None
        }
        KeyCode::Enter => {
            if view_state.playlist.is_empty() {
                None
            } else {
                Some(UserCommand::SelectRow(view_state.cursor))
            }
        }
        KeyCode::Char(' ') => Some(UserCommand::TogglePlayback),
        KeyCode::Left => Some(UserCommand::Seek(-SEEK_STEP_SECS)),
        KeyCode::Right => Some(UserCommand::Seek(SEEK_STEP_SECS)),
        KeyCode::Char('r') => Some(UserCommand::RefreshPlaylist),
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_core::protocol::Video;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn with_playlist(n: usize) -> ViewState {
        let mut state = ViewState::default();
        state.playlist = (0..n)
            .map(|i| Video::new(format!("http://h/videos/{i}.mp4"), format!("{i}.mp4")))
            .collect();
        state
    }

    // -- Cursor --

    #[test]
    fn down_and_up_move_cursor_within_bounds() {
        let mut state = with_playlist(3);
        assert_eq!(handle_key(key(KeyCode::Down), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Char('j')), &mut state), None);
        assert_eq!(state.cursor, 2);
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.cursor, 2, "cursor stops at the last row");

        handle_key(key(KeyCode::Char('k')), &mut state);
        handle_key(key(KeyCode::Up), &mut state);
        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.cursor, 0, "cursor stops at the first row");
    }

    #[test]
    fn cursor_on_empty_playlist_stays_at_zero() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.cursor, 0);
    }

    // -- Commands --

    #[test]
    fn enter_selects_cursor_row() {
        let mut state = with_playlist(3);
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(
            handle_key(key(KeyCode::Enter), &mut state),
            Some(UserCommand::SelectRow(1))
        );
    }

    #[test]
    fn enter_on_empty_playlist_does_nothing() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
    }

    #[test]
    fn transport_keys() {
        let mut state = with_playlist(1);
        assert_eq!(
            handle_key(key(KeyCode::Char(' ')), &mut state),
            Some(UserCommand::TogglePlayback)
        );
        assert_eq!(
            handle_key(key(KeyCode::Left), &mut state),
            Some(UserCommand::Seek(-5.0))
        );
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::Seek(5.0))
        );
    }

    #[test]
    fn r_refreshes_playlist() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::RefreshPlaylist)
        );
    }

    #[test]
    fn q_and_ctrl_c_quit() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('q')), &mut state),
            Some(UserCommand::Quit)
        );
        assert_eq!(
            handle_key(ctrl_key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut release = key(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        assert_eq!(handle_key(release, &mut state), None);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut state = with_playlist(2);
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), None);
        assert_eq!(handle_key(key(KeyCode::Tab), &mut state), None);
        assert_eq!(state.cursor, 0);
    }
}
