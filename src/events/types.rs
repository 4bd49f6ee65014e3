// src/events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

// ============================================================================
// MOVE PROGRESS EVENTS
// ============================================================================

/// Emitted exactly once when a mover begins work on a record.
/// `max` is the progress ceiling for the move (source size in bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMoveStarted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: Uuid,
    pub source_path: PathBuf,
    pub max: u64,
}

impl FileMoveStarted {
    pub fn new(record_id: Uuid, source_path: PathBuf, max: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            source_path,
            max,
        }
    }
}

impl DomainEvent for FileMoveStarted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "FileMoveStarted" }
}

/// Emitted zero or more times while a mover copies data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMoveProgressed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: Uuid,
    pub value: u64,
    pub status: Option<String>,
}

impl FileMoveProgressed {
    pub fn new(record_id: Uuid, value: u64, status: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            value,
            status,
        }
    }
}

impl DomainEvent for FileMoveProgressed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "FileMoveProgressed" }
}

/// Emitted exactly once when a mover finishes, success or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMoveFinished {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: Uuid,
    pub success: bool,
    pub destination: Option<PathBuf>,
}

impl FileMoveFinished {
    pub fn new(record_id: Uuid, success: bool, destination: Option<PathBuf>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            success,
            destination,
        }
    }
}

impl DomainEvent for FileMoveFinished {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "FileMoveFinished" }
}

// ============================================================================
// BATCH EVENTS
// ============================================================================

/// Emitted when a batch run ends and every record is terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveBatchCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub total: usize,
    pub moved: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl MoveBatchCompleted {
    pub fn new(total: usize, moved: usize, failed: usize, skipped: usize, duration_ms: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            total,
            moved,
            failed,
            skipped,
            duration_ms,
        }
    }
}

impl DomainEvent for MoveBatchCompleted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "MoveBatchCompleted" }
}

/// Emitted when other copies of a just-moved episode are found in its
/// destination directory. Deletion is the user's call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesDetected {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_id: Uuid,
    pub candidates: Vec<PathBuf>,
}

impl DuplicatesDetected {
    pub fn new(record_id: Uuid, candidates: Vec<PathBuf>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            record_id,
            candidates,
        }
    }
}

impl DomainEvent for DuplicatesDetected {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "DuplicatesDetected" }
}

// ============================================================================
// RESOLUTION EVENTS
// ============================================================================

/// Emitted when a user's disambiguation choice is remembered for a
/// query string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowPinned {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub query: String,
    pub show_id: String,
}

impl ShowPinned {
    pub fn new(query: String, show_id: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            query,
            show_id,
        }
    }
}

impl DomainEvent for ShowPinned {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ShowPinned" }
}
