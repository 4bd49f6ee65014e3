// src/events/mod.rs
//
// Internal Event System - Public API
//
// The EventHandler type alias is internal to the bus module and is
// deliberately not exported.

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventLogEntry};
pub use types::{
    DomainEvent, DuplicatesDetected, FileMoveFinished, FileMoveProgressed, FileMoveStarted,
    MoveBatchCompleted, ShowPinned,
};

/// Initialize a new event bus
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}
