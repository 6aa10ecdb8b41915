use thiserror::Error;

/// Errors raised by the audio capture session
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No input device available: {0}")]
    DeviceUnavailable(String),

    #[error("Capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture already active")]
    AlreadyRecording,

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),
}

/// Errors raised by the event channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("WebSocket error: {0}")]
    Transport(String),

    #[error("Reconnection attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },
}

/// Errors raised by the transcription client
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("A transcription is already in progress")]
    AlreadyRunning,

    #[error("Transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcription server error: {detail}")]
    Remote { detail: String },

    #[error("Invalid response from transcription server: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
