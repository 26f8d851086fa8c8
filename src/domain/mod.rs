//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Error types, validation rules and money arithmetic live here.

pub mod errors;
pub mod money;
pub mod validation;

pub use errors::DomainError;
