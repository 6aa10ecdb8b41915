use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Options requested for a capture session
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub sample_rate: u32,
    pub channel_count: u16,
    /// Requested from the device layer; ignored when unsupported
    pub echo_cancellation: bool,
    /// Requested from the device layer; ignored when unsupported
    pub noise_suppression: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for Whisper
            channel_count: 1,   // Mono
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream on a dedicated thread
/// - Fixture: in-memory frames (for testing/batch processing)
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that will receive audio frames until the
    /// backend stops.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Default microphone input
    Microphone,
    /// Pre-recorded frames delivered as if captured live
    Fixture(Vec<AudioFrame>),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(
        source: CaptureSource,
        options: CaptureOptions,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            CaptureSource::Microphone => {
                let backend = super::mic::MicBackend::new(options);
                Ok(Box::new(backend))
            }
            CaptureSource::Fixture(frames) => {
                let backend = super::fixture::FixtureBackend::new(frames);
                Ok(Box::new(backend))
            }
        }
    }
}
