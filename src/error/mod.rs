// src/error/mod.rs
//
// Error Module - Public API

pub mod types;

pub use types::{AppError, AppResult};
