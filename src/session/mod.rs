pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{RecordingSnapshot, SessionPhase, COMPLETED_STATUS, READY_STATUS};
