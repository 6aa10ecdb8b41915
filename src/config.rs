use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcription: TranscriptionConfig,
    pub events: EventsConfig,
    pub audio: AudioConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the whisper-style server
    pub base_url: String,
    /// Model identifier sent with each request (server default when None)
    pub model: Option<String>,
    /// Response format requested from the server: json | text | srt
    pub response_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// WebSocket endpoint for the event channel
    pub url: String,
    pub reconnect: ReconnectConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Pause between finishing one file and starting the next
    pub drain_delay_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "voxline".to_string(),
            },
            transcription: TranscriptionConfig {
                base_url: "http://localhost:8000".to_string(),
                model: None,
                response_format: "json".to_string(),
            },
            events: EventsConfig {
                url: "ws://localhost:8000/ws".to_string(),
                reconnect: ReconnectConfig {
                    initial_delay_ms: 1000,
                    max_attempts: 5,
                },
            },
            audio: AudioConfig {
                sample_rate: 16000, // Whisper expects 16kHz
                channels: 1,        // Mono
                echo_cancellation: true,
                noise_suppression: true,
            },
            queue: QueueConfig { drain_delay_ms: 500 },
        }
    }
}
