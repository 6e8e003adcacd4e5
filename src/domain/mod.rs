//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod validation;

pub use entities::*;
pub use error::{DomainError, InvariantReport, Operation};
pub use validation::{validate, Validation, Violation};
