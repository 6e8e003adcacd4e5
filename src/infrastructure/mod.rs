//! Infrastructure layer: store realizations and DI container
//!
//! This layer implements the storage boundary trait and wires up services.

pub mod di;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{NestedSetStore, Side};
