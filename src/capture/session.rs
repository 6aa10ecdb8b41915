//! Exclusive owner of the capture device for one recording.
//!
//! While active, the session accumulates PCM samples, tracks an RMS level
//! normalized to [0,1], and publishes that level at display cadence through
//! a watch channel. `stop()` releases the device on every exit path and
//! returns the accumulated samples encoded as a WAV blob.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{CaptureBackend, CaptureBackendFactory, CaptureOptions, CaptureSource};
use crate::error::CaptureError;

/// Level publish cadence, roughly display-refresh rate
const LEVEL_INTERVAL_MS: u64 = 16;

/// Observable capture state
#[derive(Debug, Clone, Default)]
pub struct AudioCaptureState {
    pub is_recording: bool,
    pub duration_secs: f64,
    /// RMS level normalized to [0,1]
    pub audio_level: f32,
    pub error: Option<String>,
}

pub struct CaptureSession {
    backend: Option<Box<dyn CaptureBackend>>,
    options: CaptureOptions,
    samples: Arc<Mutex<Vec<i16>>>,
    latest_level: Arc<Mutex<f32>>,
    level_tx: watch::Sender<f32>,
    collector: Option<JoinHandle<()>>,
    meter: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    error: Option<String>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        let (level_tx, _) = watch::channel(0.0);
        Self {
            backend: None,
            options: CaptureOptions::default(),
            samples: Arc::new(Mutex::new(Vec::new())),
            latest_level: Arc::new(Mutex::new(0.0)),
            level_tx,
            collector: None,
            meter: None,
            started_at: None,
            error: None,
        }
    }

    /// Acquire the device and start recording. Fails when the device is
    /// absent or permission is refused; the failure is also recorded in the
    /// session state.
    pub async fn start(
        &mut self,
        source: CaptureSource,
        options: CaptureOptions,
    ) -> Result<(), CaptureError> {
        if self.backend.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        self.error = None;
        let mut backend = CaptureBackendFactory::create(source, options.clone())?;

        let mut frame_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.samples.lock().expect("samples lock poisoned").clear();
        *self.latest_level.lock().expect("level lock poisoned") = 0.0;

        // Collector: accumulate samples and keep the latest RMS level
        let samples = Arc::clone(&self.samples);
        let latest_level = Arc::clone(&self.latest_level);
        self.collector = Some(tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let level = rms_level(&frame.samples);
                *latest_level.lock().expect("level lock poisoned") = level;
                samples
                    .lock()
                    .expect("samples lock poisoned")
                    .extend_from_slice(&frame.samples);
            }
        }));

        // Meter: publish the level at ~60 Hz for any subscriber
        let latest_level = Arc::clone(&self.latest_level);
        let level_tx = self.level_tx.clone();
        self.meter = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(LEVEL_INTERVAL_MS));
            loop {
                interval.tick().await;
                let level = *latest_level.lock().expect("level lock poisoned");
                // No receivers is fine; keep publishing for late subscribers
                let _ = level_tx.send(level);
            }
        }));

        self.options = options;
        self.started_at = Some(Instant::now());
        self.backend = Some(backend);
        info!("Capture session started ({})", self.backend.as_ref().map(|b| b.name()).unwrap_or("?"));

        Ok(())
    }

    /// Stop capturing, release the device, and return the accumulated
    /// samples as a WAV blob. Returns `None` when nothing was recording.
    /// The device is released on every exit path, including errors.
    pub async fn stop(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        let mut backend = match self.backend.take() {
            Some(backend) => backend,
            None => return Ok(None),
        };

        let stop_result = backend.stop().await;
        drop(backend);

        if let Some(meter) = self.meter.take() {
            meter.abort();
        }
        if let Some(collector) = self.collector.take() {
            // Backend stop closed the frame channel; drain the remainder
            let _ = collector.await;
        }
        self.started_at = None;
        *self.latest_level.lock().expect("level lock poisoned") = 0.0;
        let _ = self.level_tx.send(0.0);

        if let Err(e) = stop_result {
            // Device is released regardless; surface the error in state and
            // still hand back whatever was captured.
            warn!("Capture backend stop failed: {}", e);
            self.error = Some(e.to_string());
        }

        let samples: Vec<i16> = {
            let mut samples = self.samples.lock().expect("samples lock poisoned");
            std::mem::take(&mut *samples)
        };

        let blob = encode_wav(&samples, self.options.sample_rate, self.options.channel_count)?;
        info!(
            "Capture session stopped: {} samples, {} byte blob",
            samples.len(),
            blob.len()
        );
        Ok(Some(blob))
    }

    /// Watch receiver for the live audio level
    pub fn level_watch(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    /// Snapshot of the capture state
    pub fn state(&self) -> AudioCaptureState {
        AudioCaptureState {
            is_recording: self.backend.is_some(),
            duration_secs: self
                .started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
            audio_level: *self.latest_level.lock().expect("level lock poisoned"),
            error: self.error.clone(),
        }
    }
}

/// A session dropped without `stop()` still releases the device: the
/// backend's own drop signals its capture thread or replay task to exit,
/// and the meter and collector tasks are aborted here. Accumulated samples
/// are discarded on this path.
impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(meter) = self.meter.take() {
            meter.abort();
        }
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        if self.backend.take().is_some() {
            warn!("Capture session dropped while active, releasing device");
        }
    }
}

/// RMS of one frame, normalized to [0,1]
fn rms_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    ((sum_squares / samples.len() as f64).sqrt() as f32).clamp(0.0, 1.0)
}

/// Encode i16 PCM samples as a WAV byte blob
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
