pub mod channel;
pub mod messages;
pub mod registry;

pub use channel::{ConnectionState, EventChannel, ReconnectPolicy};
pub use messages::{EventMessage, EventType};
pub use registry::{SubscriberRegistry, Subscription};
