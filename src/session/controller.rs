//! Recording session state machine: Idle → Recording → Transcribing → Idle.
//!
//! Exactly one controller exists per process (constructed by the
//! application context); no two sessions are ever concurrently Recording
//! or Transcribing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::state::{RecordingSnapshot, SessionPhase, COMPLETED_STATUS, READY_STATUS};
use crate::error::TranscribeError;
use crate::notify::{Notifier, PipelineEvent};
use crate::transcribe::{Transcriber, TranscriptionRequest};

/// How long the success status stays visible before reverting to "Ready"
const STATUS_REVERT_WINDOW: Duration = Duration::from_secs(2);

struct Inner {
    phase: SessionPhase,
    progress: u8,
    status_text: String,
    duration_secs: u64,
    started_at: Option<chrono::DateTime<Utc>>,
    tick: Option<JoinHandle<()>>,
    revert: Option<JoinHandle<()>>,
}

impl Inner {
    fn reset_to_idle(&mut self) {
        self.phase = SessionPhase::Idle;
        self.progress = 0;
        self.duration_secs = 0;
        self.started_at = None;
        if let Some(tick) = self.tick.take() {
            tick.abort();
        }
        if let Some(revert) = self.revert.take() {
            revert.abort();
        }
    }
}

pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    transcriber: Arc<dyn Transcriber>,
    notifier: Arc<dyn Notifier>,
}

impl SessionController {
    pub fn new(transcriber: Arc<dyn Transcriber>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: SessionPhase::Idle,
                progress: 0,
                status_text: READY_STATUS.to_string(),
                duration_secs: 0,
                started_at: None,
                tick: None,
                revert: None,
            })),
            transcriber,
            notifier,
        }
    }

    /// Idle → Recording; starts the 1 Hz duration tick.
    pub fn start(&self) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        if inner.phase != SessionPhase::Idle {
            warn!("Recording already in progress, ignoring start");
            return;
        }

        inner.phase = SessionPhase::Recording;
        inner.progress = 0;
        inner.duration_secs = 0;
        inner.started_at = Some(Utc::now());
        inner.status_text = "Recording...".to_string();
        if let Some(revert) = inner.revert.take() {
            revert.abort();
        }

        let shared = Arc::clone(&self.inner);
        inner.tick = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let mut inner = shared.lock().expect("session lock poisoned");
                if inner.phase != SessionPhase::Recording {
                    break;
                }
                inner.duration_secs += 1;
            }
        }));
        drop(inner);

        info!("Recording started");
        self.notifier.notify(PipelineEvent::RecordingStarted);
    }

    /// Recording → Transcribing; stops the tick and resets progress.
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock().expect("session lock poisoned");
            if inner.phase != SessionPhase::Recording {
                warn!("Not recording, ignoring stop");
                return;
            }
            inner.phase = SessionPhase::Transcribing;
            inner.progress = 0;
            inner.status_text = "Transcribing...".to_string();
            if let Some(tick) = inner.tick.take() {
                tick.abort();
            }
        }

        info!("Recording stopped, transcription pending");
        self.notifier.notify(PipelineEvent::RecordingStopped);
    }

    /// {Recording|Transcribing} → Idle; clears progress, duration, and
    /// status back to defaults.
    ///
    /// Cancellation is cooperative: an in-flight transcription request is
    /// not aborted, its eventual response is simply ignored. Callers that
    /// need hard cancellation must abort at the transport layer.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner.lock().expect("session lock poisoned");
            if inner.phase == SessionPhase::Idle {
                return;
            }
            inner.reset_to_idle();
            inner.status_text = READY_STATUS.to_string();
        }

        info!("Session cancelled");
        self.notifier.notify(PipelineEvent::RecordingCancelled);
    }

    /// Update progress while Transcribing; the percentage is clamped into
    /// [0,100]. Ignored in any other phase.
    pub fn update_progress(&self, pct: i64, text: Option<&str>) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        if inner.phase != SessionPhase::Transcribing {
            warn!("Progress update outside transcription, ignoring");
            return;
        }
        inner.progress = pct.clamp(0, 100) as u8;
        if let Some(text) = text {
            inner.status_text = text.to_string();
        }
    }

    /// Transcribing → Idle with a success status that reverts to
    /// [`READY_STATUS`] after a fixed 2-second window.
    pub fn complete_transcription(&self) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        if inner.phase != SessionPhase::Transcribing {
            warn!("No transcription in progress, ignoring completion");
            return;
        }
        inner.reset_to_idle();
        inner.status_text = COMPLETED_STATUS.to_string();

        let shared = Arc::clone(&self.inner);
        inner.revert = Some(tokio::spawn(async move {
            tokio::time::sleep(STATUS_REVERT_WINDOW).await;
            let mut inner = shared.lock().expect("session lock poisoned");
            if inner.phase == SessionPhase::Idle && inner.status_text == COMPLETED_STATUS {
                inner.status_text = READY_STATUS.to_string();
            }
        }));
    }

    /// Any state → Idle with the given message as the status line.
    pub fn fail(&self, message: &str) {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        inner.reset_to_idle();
        inner.status_text = message.to_string();
    }

    /// Orchestrates one blob through transcription: applies stop()
    /// semantics, submits, then completes or fails. Errors are recorded in
    /// the session state and also returned to the caller.
    ///
    /// At most one blob is mid-flight at a time; a second call while
    /// Transcribing is rejected without touching the running submission.
    pub async fn transcribe_blob(&self, blob: Vec<u8>) -> Result<String, TranscribeError> {
        if !self.enter_transcribing() {
            warn!("Transcription already in progress, rejecting blob");
            return Err(TranscribeError::AlreadyRunning);
        }
        self.notifier.notify(PipelineEvent::TranscriptionStarted);

        let request = TranscriptionRequest::wav_blob(blob);
        match self.transcriber.transcribe(request).await {
            Ok(response) => {
                self.complete_transcription();
                info!("Transcription completed ({} chars)", response.text.len());
                self.notifier.notify(PipelineEvent::TranscriptionCompleted {
                    text: response.text.clone(),
                });
                Ok(response.text)
            }
            Err(e) => {
                let message = e.to_string();
                self.fail(&message);
                warn!("Transcription failed: {}", message);
                self.notifier
                    .notify(PipelineEvent::TranscriptionError { message });
                Err(e)
            }
        }
    }

    /// Snapshot for the presentation layer
    pub fn snapshot(&self) -> RecordingSnapshot {
        let inner = self.inner.lock().expect("session lock poisoned");
        RecordingSnapshot {
            is_active: inner.phase == SessionPhase::Recording,
            is_transcribing: inner.phase == SessionPhase::Transcribing,
            transcription_progress: inner.progress,
            status_text: inner.status_text.clone(),
            duration_secs: inner.duration_secs,
            started_at: inner.started_at,
        }
    }

    /// Move into Transcribing from Idle or Recording (stop semantics).
    /// Returns false when a transcription is already underway.
    fn enter_transcribing(&self) -> bool {
        {
            let mut inner = self.inner.lock().expect("session lock poisoned");
            match inner.phase {
                SessionPhase::Transcribing => return false,
                SessionPhase::Idle => {
                    inner.phase = SessionPhase::Transcribing;
                    inner.progress = 0;
                    inner.status_text = "Transcribing...".to_string();
                    return true;
                }
                SessionPhase::Recording => {}
            }
        }
        self.stop();
        true
    }
}
