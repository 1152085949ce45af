// Which video is the playback target.

use tracing::debug;

use clipsync_core::config::StaleSelection;
use clipsync_core::protocol::Video;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    current: Option<Video>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Video> {
        self.current.as_ref()
    }

    /// Re-evaluate the selection against `playlist`. Returns true when the
    /// selection changed.
    ///
    /// With nothing selected the first row is chosen. An existing selection
    /// is kept, unless `on_stale` is `ResetToFirst` and the playlist no
    /// longer contains it. An empty playlist never clears the selection.
    pub fn apply_policy(&mut self, playlist: &[Video], on_stale: StaleSelection) -> bool {
        let Some(first) = playlist.first() else {
            return false;
        };
        match &self.current {
            None => {
                debug!("Auto-selecting first video: {}", first.name);
                self.current = Some(first.clone());
                true
            }
            Some(current)
                if on_stale == StaleSelection::ResetToFirst && !playlist.contains(current) =>
            {
                debug!(
                    "Selected video {} no longer listed, resetting to {}",
                    current.name, first.name
                );
                self.current = Some(first.clone());
                true
            }
            Some(_) => false,
        }
    }

    /// Choose row `index`. Out-of-range rows are ignored. Returns true when
    /// the selection changed.
    pub fn select_row(&mut self, index: usize, playlist: &[Video]) -> bool {
        let Some(video) = playlist.get(index) else {
            debug!(
                "Ignoring selection of row {index}, playlist has {} rows",
                playlist.len()
            );
            return false;
        };
        if self.current.as_ref() == Some(video) {
            return false;
        }
        self.current = Some(video.clone());
        true
    }
}
