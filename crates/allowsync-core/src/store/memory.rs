// # Memory Registry Store
//
// In-memory implementation of RegistryStore.
//
// ## When to Use
//
// - Tests
// - Embedding allowsync in a tool that builds the registry itself
//
// Loading an empty store behaves like loading a missing file: the default
// registry is created and kept.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::accounts::Registry;
use crate::traits::RegistryStore;

/// In-memory registry store
///
/// Clones share the same underlying registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistryStore {
    inner: Arc<RwLock<Option<Registry>>>,
}

impl MemoryRegistryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `registry`
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(registry))),
        }
    }

    /// Check whether anything has been stored yet
    pub async fn is_initialized(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn load(&self) -> Result<Registry, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.get_or_insert_with(Registry::default).clone())
    }

    async fn save(&self, registry: &Registry) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = Some(registry.clone());
        Ok(())
    }
}
