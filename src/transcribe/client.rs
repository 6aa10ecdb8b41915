//! HTTP client for the whisper-style transcription server.
//!
//! The boundary is a multipart POST of the audio bytes plus optional model
//! and response format fields; failures come back as `{"detail": "..."}`.

use serde::{Deserialize, Serialize};

use crate::config::TranscriptionConfig;
use crate::error::TranscribeError;

/// One transcription submission
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub model: Option<String>,
    /// json | text | srt
    pub response_format: String,
}

impl TranscriptionRequest {
    pub fn wav_blob(audio: Vec<u8>) -> Self {
        Self {
            audio,
            file_name: "recording.wav".to_string(),
            model: None,
            response_format: "json".to_string(),
        }
    }
}

/// Successful transcription response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
    pub language: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    pub text: String,
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// GET /health response
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub device: String,
}

/// GET /models response
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub ready: bool,
}

/// Seam for driving the session and the file queue from tests
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscribeError>;
}

pub struct TranscriptionClient {
    http: reqwest::Client,
    base_url: String,
    model: Option<String>,
    response_format: String,
}

impl TranscriptionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: None,
            response_format: "json".to_string(),
        }
    }

    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let mut client = Self::new(config.base_url.clone());
        client.model = config.model.clone();
        client.response_format = config.response_format.clone();
        client
    }

    /// Defaults applied to requests that do not set their own
    pub fn request_for_blob(&self, audio: Vec<u8>) -> TranscriptionRequest {
        TranscriptionRequest {
            audio,
            file_name: "recording.wav".to_string(),
            model: self.model.clone(),
            response_format: self.response_format.clone(),
        }
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthStatus, TranscribeError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// GET /models
    pub async fn models(&self) -> Result<Vec<ModelEntry>, TranscribeError> {
        let url = format!("{}/models", self.base_url);
        let response = self.http.get(&url).send().await?;
        let response = check_status(response).await?;
        let list: ModelList = response.json().await?;
        Ok(list.data)
    }
}

#[async_trait::async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscribeError> {
        let url = format!("{}/transcribe", self.base_url);

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(request.audio)
                    .file_name(request.file_name)
                    .mime_str("audio/wav")?,
            )
            .text("response_format", request.response_format);

        if let Some(model) = request.model {
            form = form.text("model", model);
        }

        let response = self.http.post(&url).multipart(form).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Translate a non-success response into the server's `{detail}` error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TranscribeError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let detail = match response.text().await {
        Ok(body) => match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.detail,
            Err(_) if !body.is_empty() => body,
            Err(_) => format!("HTTP {}", status),
        },
        Err(_) => format!("HTTP {}", status),
    };
    Err(TranscribeError::Remote { detail })
}
