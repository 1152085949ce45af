// Screen layout: panel arrangement and sizing.
//
// +---------------------------------------------------------------+
// | Status Bar (1 row)                                             |
// +------------------+-----------------------+--------------------+
// | Playlist (30%)   | Player (65%)          | Prompts (50%)      |
// |                  +-----------------------+--------------------+
// |                  | Speech to Text (35%)  | Responses (50%)    |
// +------------------+-----------------------+--------------------+
// | Help Bar (1 row)                                               |
// +---------------------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: connection and session status.
    pub status_bar: Rect,
    /// Left column: the playlist.
    pub playlist: Rect,
    /// Middle column top: the selected video and its transport state.
    pub player: Rect,
    pub speech: Rect,
    pub prompts: Rect,
    pub responses: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(8),    // columns
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(vertical[1]);

    let player_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(columns[1]);

    let llm_column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[2]);

    AppLayout {
        status_bar: vertical[0],
        playlist: columns[0],
        player: player_column[0],
        speech: player_column[1],
        prompts: llm_column[0],
        responses: llm_column[1],
        help_bar: vertical[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    #[test]
    fn layout_all_rects_nonzero() {
        let layout = build_layout(test_area());
        let rects = [
            ("status_bar", layout.status_bar),
            ("playlist", layout.playlist),
            ("player", layout.player),
            ("speech", layout.speech),
            ("prompts", layout.prompts),
            ("responses", layout.responses),
            ("help_bar", layout.help_bar),
        ];
        for (name, rect) in &rects {
            assert!(
                rect.width > 0 && rect.height > 0,
                "{} has zero area: {:?}",
                name,
                rect
            );
        }
    }

    #[test]
    fn bars_are_single_rows_at_the_edges() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.status_bar.y, 0);
        assert_eq!(layout.help_bar.height, 1);
        assert_eq!(layout.help_bar.y, 39);
    }

    #[test]
    fn columns_are_left_to_right() {
        let layout = build_layout(test_area());
        assert!(layout.playlist.x < layout.player.x);
        assert!(layout.player.x < layout.prompts.x);
        assert_eq!(layout.player.x, layout.speech.x);
        assert_eq!(layout.prompts.x, layout.responses.x);
        assert!(layout.player.y < layout.speech.y);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let _ = build_layout(Rect::new(0, 0, 10, 3));
    }
}
