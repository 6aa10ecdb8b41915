pub mod backend;
pub mod fixture;
pub mod mic;
pub mod session;

pub use backend::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureOptions, CaptureSource,
};
pub use session::{AudioCaptureState, CaptureSession};
