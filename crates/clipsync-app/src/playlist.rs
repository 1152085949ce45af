// Playlist store: the current list of videos and the fetches that fill it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use clipsync_core::protocol::Video;

use crate::api::ServerApi;

/// Result of one spawned playlist fetch, tagged with the generation it was
/// issued under.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    Loaded { generation: u64, videos: Vec<Video> },
    Failed { generation: u64, error: String },
}

impl PlaylistEvent {
    pub fn generation(&self) -> u64 {
        match self {
            PlaylistEvent::Loaded { generation, .. } => *generation,
            PlaylistEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// The playlist plus bookkeeping for in-flight fetches.
///
/// Every issued fetch bumps `generation`; only a result carrying the latest
/// generation is applied, so a slow response for an earlier request can never
/// overwrite a newer one.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    videos: Vec<Video>,
    url: Option<String>,
    generation: u64,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Point the store at `url`. Returns the generation of the fetch to
    /// issue, or `None` when the url is unchanged.
    pub fn set_url(&mut self, url: &str) -> Option<u64> {
        if self.url.as_deref() == Some(url) {
            debug!("Playlist url unchanged ({url}), not refetching");
            return None;
        }
        self.url = Some(url.to_string());
        Some(self.next_generation())
    }

    /// Re-issue a fetch for the current url. `None` when no url is set.
    pub fn refresh(&mut self) -> Option<u64> {
        self.url.as_ref()?;
        Some(self.next_generation())
    }

    /// Apply a fetch result. Returns true when the playlist was replaced.
    ///
    /// Stale generations are discarded. A failure leaves the playlist as it
    /// was.
    pub fn apply(&mut self, event: PlaylistEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                "Discarding stale playlist result (gen {} != current {})",
                event.generation(),
                self.generation
            );
            return false;
        }
        match event {
            PlaylistEvent::Loaded { videos, .. } => {
                info!("Playlist loaded: {} videos", videos.len());
                self.videos = videos;
                true
            }
            PlaylistEvent::Failed { error, .. } => {
                warn!("Playlist fetch failed: {error}");
                false
            }
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Fetch the playlist on a background task and report back on `tx`.
///
/// A closed receiver means the orchestrator has stopped; the result is
/// dropped.
pub fn spawn_fetch(
    api: Arc<dyn ServerApi>,
    url: String,
    cookie: Option<String>,
    generation: u64,
    tx: mpsc::Sender<PlaylistEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Fetching playlist from {url} (gen {generation})");
        let event = match api.fetch_playlist(&url, cookie.as_deref()).await {
            Ok(videos) => PlaylistEvent::Loaded { generation, videos },
            Err(e) => PlaylistEvent::Failed {
                generation,
                error: e.to_string(),
            },
        };
        let _ = tx.send(event).await;
    })
}
