//! Plugin-based backend registry
//!
//! The registry maps each [`BackendKind`] to the adapter that serves it, so
//! the engine never hard-codes which crates implement which platform.
//!
//! ## Registration
//!
//! Adapter crates expose a `register` function called during startup:
//!
//! ```rust,ignore
//! use allowsync_core::BackendRegistry;
//!
//! let registry = BackendRegistry::new();
//! allowsync_backend_atlas::register(&registry, "atlas", runner.clone());
//! allowsync_backend_aws::register(&registry, "aws", runner);
//! ```

use crate::accounts::BackendKind;
use crate::traits::AllowListBackend;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of allow-list backends, keyed by the account kind they serve
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<HashMap<BackendKind, Arc<dyn AllowListBackend>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under the kind it reports
    ///
    /// A later registration for the same kind replaces the earlier one.
    pub fn register_backend(&self, backend: Arc<dyn AllowListBackend>) {
        let kind = backend.kind();
        tracing::debug!("Registering {} backend for {}", backend.backend_name(), kind);

        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.insert(kind, backend);
    }

    /// Get the backend serving `kind`
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn AllowListBackend>> {
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.get(&kind).cloned()
    }

    /// Check if a backend is registered for `kind`
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.get(kind).is_some()
    }
}
