use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default status line shown while idle
pub const READY_STATUS: &str = "Ready";

/// Status line shown after a successful transcription, reverted to
/// [`READY_STATUS`] after a short display window
pub const COMPLETED_STATUS: &str = "Transcription complete";

/// Lifecycle phase of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Recording,
    Transcribing,
}

/// Snapshot of the recording session, safe to hand to any presentation
/// layer. `is_active` and `is_transcribing` are never both true: a session
/// is either capturing or transcribing, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSnapshot {
    pub is_active: bool,
    pub is_transcribing: bool,
    /// 0-100
    pub transcription_progress: u8,
    pub status_text: String,
    /// Whole seconds since recording started
    pub duration_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for RecordingSnapshot {
    fn default() -> Self {
        Self {
            is_active: false,
            is_transcribing: false,
            transcription_progress: 0,
            status_text: READY_STATUS.to_string(),
            duration_secs: 0,
            started_at: None,
        }
    }
}
