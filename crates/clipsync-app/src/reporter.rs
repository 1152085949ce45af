// Playback reporter: drives the playback surface for the selected video and
// turns play/pause transitions into control reports, delivered in order by a
// single background worker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use clipsync_core::protocol::{
    ControlReport, PlaybackState, TransportAction, TransportEvent, Video,
};

use crate::api::ServerApi;
use crate::player::PlaybackSurface;

// ---------------------------------------------------------------------------
// PlaybackReporter
// ---------------------------------------------------------------------------

pub struct PlaybackReporter {
    surface: Box<dyn PlaybackSurface>,
    target: Option<Video>,
    state: PlaybackState,
    is_paused: bool,
}

impl PlaybackReporter {
    pub fn new(surface: Box<dyn PlaybackSurface>) -> Self {
        PlaybackReporter {
            surface,
            target: None,
            state: PlaybackState::Stopped,
            is_paused: false,
        }
    }

    pub fn target(&self) -> Option<&Video> {
        self.target.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True after a pause, until the next play.
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Current playhead, 0 when nothing is loaded.
    pub fn position(&self) -> f64 {
        if self.target.is_some() {
            self.surface.current_time()
        } else {
            0.0
        }
    }

    /// Switch to `video`. Loading a different video stops playback and
    /// rewinds to 0 without producing a report. Returns true when the target
    /// changed.
    pub fn set_target(&mut self, video: Option<&Video>) -> bool {
        if self.target.as_ref() == video {
            return false;
        }
        match video {
            Some(video) => {
                info!("Loading {} ({})", video.name, video.url);
                self.surface.load(&video.url);
            }
            None => self.surface.pause(),
        }
        self.target = video.cloned();
        self.state = PlaybackState::Stopped;
        self.is_paused = false;
        true
    }

    /// Stopped/Paused -> Playing. The reported time is the playhead at the
    /// moment playback starts.
    pub fn play(&mut self) -> Option<TransportEvent> {
        let video_name = self.target.as_ref()?.name.clone();
        if self.state == PlaybackState::Playing {
            debug!("Ignoring play for {video_name}: already playing");
            return None;
        }
        let time = self.surface.current_time();
        self.surface.play();
        self.state = PlaybackState::Playing;
        self.is_paused = false;
        Some(TransportEvent {
            action: TransportAction::Play,
            time,
            video_name,
        })
    }

    /// Playing -> Paused. The reported time is the playhead after pausing.
    pub fn pause(&mut self) -> Option<TransportEvent> {
        let video_name = self.target.as_ref()?.name.clone();
        if self.state != PlaybackState::Playing {
            debug!("Ignoring pause for {video_name}: not playing");
            return None;
        }
        self.surface.pause();
        self.state = PlaybackState::Paused;
        self.is_paused = true;
        let time = self.surface.current_time();
        Some(TransportEvent {
            action: TransportAction::Pause,
            time,
            video_name,
        })
    }

    pub fn toggle(&mut self) -> Option<TransportEvent> {
        if self.state == PlaybackState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Move the playhead by `delta` seconds. Seeking is local only. Returns
    /// false when nothing is loaded.
    pub fn seek_by(&mut self, delta: f64) -> bool {
        if self.target.is_none() {
            return false;
        }
        let position = self.surface.current_time() + delta;
        self.surface.seek(position);
        true
    }
}

// ---------------------------------------------------------------------------
// Ordered report queue
// ---------------------------------------------------------------------------

/// A report waiting for delivery, with the `Cookie` header captured when it
/// was enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedReport {
    pub report: ControlReport,
    pub cookie: Option<String>,
}

/// Producer side of the report queue. Sequence numbers are assigned here, in
/// enqueue order.
pub struct ReportQueue {
    tx: mpsc::Sender<QueuedReport>,
    next_seq: u64,
}

/// Create a bounded report queue. The receiver goes to
/// [`run_report_worker`].
pub fn report_queue(capacity: usize) -> (ReportQueue, mpsc::Receiver<QueuedReport>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ReportQueue { tx, next_seq: 1 }, rx)
}

impl ReportQueue {
    /// Queue `event` for delivery without waiting. Returns the assigned
    /// sequence number, or `None` if the report was dropped because the queue
    /// is full or the worker is gone.
    pub fn enqueue(&mut self, event: TransportEvent, cookie: Option<String>) -> Option<u64> {
        let seq = self.next_seq;
        let queued = QueuedReport {
            report: ControlReport { event, seq },
            cookie,
        };
        match self.tx.try_send(queued) {
            Ok(()) => {
                self.next_seq += 1;
                Some(seq)
            }
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    "Report queue full, dropping {} at {:.3}s for {}",
                    dropped.report.event.action,
                    dropped.report.event.time,
                    dropped.report.event.video_name
                );
                None
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Report worker has stopped, dropping report");
                None
            }
        }
    }
}

/// Deliver queued reports one at a time, in order, until every sender is
/// dropped and the queue is drained. Failures are logged and never retried.
pub async fn run_report_worker(
    mut rx: mpsc::Receiver<QueuedReport>,
    api: Arc<dyn ServerApi>,
    control_url: String,
) {
    info!("Report worker started ({control_url})");
    let mut delivered = 0u64;
    let mut failed = 0u64;
    while let Some(queued) = rx.recv().await {
        let event = &queued.report.event;
        match api
            .post_control(&control_url, &queued.report, queued.cookie.as_deref())
            .await
        {
            Ok(()) => {
                delivered += 1;
                debug!(
                    "Reported {} at {:.3}s for {} (seq {})",
                    event.action, event.time, event.video_name, queued.report.seq
                );
            }
            Err(e) => {
                failed += 1;
                warn!(
                    "Failed to report {} for {} (seq {}): {e}",
                    event.action, event.video_name, queued.report.seq
                );
            }
        }
    }
    info!("Report worker stopped ({delivered} delivered, {failed} failed)");
}
