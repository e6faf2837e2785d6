pub mod config;
pub mod excavation;
pub mod quote;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use quote_engine::store::MemoryStore;

/// Build the configuration store for a CLI invocation: the fixture file when
/// one is given, otherwise an empty store (every lookup then resolves to the
/// compiled-in fallback configuration).
pub fn build_store(fixture: Option<&Path>) -> anyhow::Result<Arc<MemoryStore>> {
    match fixture {
        Some(path) => {
            let store = MemoryStore::from_fixture(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
