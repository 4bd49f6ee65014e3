// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod move_service;
pub mod move_types;
pub mod resolution_service;


// Re-export all services and their types
pub use move_service::{remove_duplicate, FileMover, MoveBatchRunner};

pub use move_types::{
    plan_destination,
    render_template,
    versioned_destination,
    DirectoryProber,
    DuplicateCandidate,
    DuplicateMatch,
    MoveBatchReport,
    MoveFailure,
    TemplateContext,
};

pub use resolution_service::{evaluate, score_candidates, similarity, ResolutionService};
