pub mod client;

pub use client::{
    HealthStatus, ModelEntry, Transcriber, TranscriptionClient, TranscriptionRequest,
    TranscriptionResponse, TranscriptSegment,
};
