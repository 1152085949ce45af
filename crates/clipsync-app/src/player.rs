// Playback surface abstraction and the built-in clock-driven implementation.

use tokio::time::Instant;
use tracing::debug;

/// The thing that actually plays media. The reporter drives it and reads the
/// playhead from it; it never reports anything itself.
pub trait PlaybackSurface: Send + Sync {
    /// Load a new source. Resets the playhead to 0 and stops playback.
    fn load(&mut self, source: &str);

    fn play(&mut self);

    fn pause(&mut self);

    /// Move the playhead to `position` seconds, clamped at 0.
    fn seek(&mut self, position: f64);

    /// Current playhead in seconds.
    fn current_time(&self) -> f64;
}

/// A surface with no media output: the playhead is wall-clock time that
/// advances while playing.
#[derive(Debug, Default)]
pub struct ClockSurface {
    /// Playhead at the last pause, seek or load.
    offset: f64,
    /// Set while playing.
    started: Option<Instant>,
}

impl ClockSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackSurface for ClockSurface {
    fn load(&mut self, source: &str) {
        debug!("Clock surface loaded {source}");
        self.offset = 0.0;
        self.started = None;
    }

    fn play(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.offset = self.current_time();
        self.started = None;
    }

    fn seek(&mut self, position: f64) {
        self.offset = position.max(0.0);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        match self.started {
            Some(started) => self.offset + started.elapsed().as_secs_f64(),
            None => self.offset,
        }
    }
}
