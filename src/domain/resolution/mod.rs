// src/domain/resolution/mod.rs
//
// Resolution Domain - Public API

pub mod value_objects;

pub use value_objects::{ResolutionDecision, ResolutionReason, ScoredCandidate};
