//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `NestedSetStore` boundary trait
//! but are themselves concrete structs, not traits.

mod fuzz;
mod tree;

pub use fuzz::{FuzzReport, Fuzzer};
pub use tree::TreeService;
