// Wire and inter-task message types shared by the channel, the orchestrator
// and the view.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Server wire types
// ---------------------------------------------------------------------------

/// One playable item as served by `GET /videos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Playable resource locator.
    pub url: String,
    /// Display name; also the identifier sent in transport reports.
    pub name: String,
}

impl Video {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Video {
            url: url.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportAction {
    Play,
    Pause,
}

impl fmt::Display for TransportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportAction::Play => f.write_str("play"),
            TransportAction::Pause => f.write_str("pause"),
        }
    }
}

/// A play or pause transition captured at the moment it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    pub action: TransportAction,
    /// Playback position in seconds.
    pub time: f64,
    #[serde(rename = "videoName")]
    pub video_name: String,
}

/// Body of `POST /audio-control`: a transport event tagged with its
/// enqueue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReport {
    #[serde(flatten)]
    pub event: TransportEvent,
    pub seq: u64,
}

// ---------------------------------------------------------------------------
// Local state enums
// ---------------------------------------------------------------------------

/// Session channel connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
}

/// Local transport state of the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

// ---------------------------------------------------------------------------
// Orchestrator <-> view messages
// ---------------------------------------------------------------------------

/// Everything the view needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub playlist: Vec<Video>,
    pub selection: Option<Video>,
    pub playback: PlaybackState,
    pub position: f64,
    pub connection: ConnectionStatus,
    pub has_session: bool,
}

/// Updates pushed from the orchestrator to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    StateSnapshot(Box<AppSnapshot>),
    /// Periodic position refresh while playing.
    Position(f64),
    ConnectionStatus(ConnectionStatus),
}

/// Commands sent from the view to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Choose playlist row `i` (zero-based).
    SelectRow(usize),
    TogglePlayback,
    Play,
    Pause,
    /// Move the playhead by the given number of seconds (negative = back).
    Seek(f64),
    RefreshPlaylist,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_parses_from_server_json() {
        let json = r#"[{"url":"http://localhost:8000/videos/a.mp4","name":"a.mp4"},{"name":"b","url":"b.webm"}]"#;
        let videos: Vec<Video> = serde_json::from_str(json).unwrap();
        assert_eq!(
            videos,
            vec![
                Video::new("http://localhost:8000/videos/a.mp4", "a.mp4"),
                Video::new("b.webm", "b"),
            ]
        );
    }

    #[test]
    fn video_missing_field_is_rejected() {
        let json = r#"[{"url":"a.mp4"}]"#;
        assert!(serde_json::from_str::<Vec<Video>>(json).is_err());
    }

    #[test]
    fn control_report_uses_server_field_names() {
        let report = ControlReport {
            event: TransportEvent {
                action: TransportAction::Play,
                time: 12.5,
                video_name: "B".into(),
            },
            seq: 3,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"action": "play", "time": 12.5, "videoName": "B", "seq": 3})
        );
    }

    #[test]
    fn transport_action_display() {
        assert_eq!(TransportAction::Play.to_string(), "play");
        assert_eq!(TransportAction::Pause.to_string(), "pause");
    }
}
