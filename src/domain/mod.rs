// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file declares all domain modules and re-exports their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod episode;
pub mod resolution;
pub mod show;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Show Domain
pub use show::ShowCandidate;

// Episode Domain
pub use episode::{
    validate_record, EpisodePlacement, EpisodeRecord, LifecycleState,
};

// Resolution Domain
pub use resolution::{ResolutionDecision, ResolutionReason, ScoredCandidate};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Illegal lifecycle transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Record has no resolved show")]
    MissingResolvedShow,

    #[error("Record has no season/episode placement")]
    MissingPlacement,

    #[error("Record has no destination path")]
    MissingDestination,
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
