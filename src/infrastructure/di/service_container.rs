//! Service container for dependency injection
//!
//! Selects the store realization from settings and wires up the tree service.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{Fuzzer, TreeService};
use crate::application::ApplicationResult;
use crate::config::{Backend, Settings};
use crate::infrastructure::{MemoryStore, NestedSetStore, SqliteStore};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Tree operations engine over the configured backend
    pub tree: TreeService,
}

impl ServiceContainer {
    /// Create a container with the backend named in `settings`.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let store: Box<dyn NestedSetStore> = match settings.backend {
            Backend::Memory => Box::new(MemoryStore::new()),
            Backend::Sqlite => Box::new(SqliteStore::open(&settings.db_path)?),
        };
        debug!("backend: {} ({})", settings.backend, settings.db_path.display());
        Self::with_store(settings, store)
    }

    /// Create a container around a custom store (for testing).
    pub fn with_store(settings: Settings, store: Box<dyn NestedSetStore>) -> ApplicationResult<Self> {
        let tree = TreeService::new(store, settings.root_name.clone())?
            .with_max_attempts(settings.fuzz.max_attempts);
        Ok(Self {
            settings: Arc::new(settings),
            tree,
        })
    }

    /// Fuzzer configured from settings.
    pub fn fuzzer(&self) -> Fuzzer {
        Fuzzer::from_config(&self.settings.fuzz)
    }
}
