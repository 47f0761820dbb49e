//! Event system shared by the broker orchestrator and its observers.

pub mod bus;
pub mod types;

pub use bus::EventBus;
pub use types::{Event, EventEnvelope};
