pub mod item;
pub mod processor;

pub use item::{FileInput, FileStatus, QueueStats, QueuedFile};
pub use processor::{FileQueue, QueuePacing, CANCELLED_BY_USER};
