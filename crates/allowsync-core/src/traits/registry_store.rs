// # Registry Store Trait
//
// Defines the interface for persisting the account registry.
//
// ## Purpose
//
// The registry lists every backend account to reconcile and the label they
// share. It is written by onboarding tooling and read once per run by the
// engine, which never writes it.
//
// ## Implementations
//
// - File-based: versioned JSON document with atomic writes
// - In-memory: tests and embedding
//
// ## Usage
//
// ```rust,ignore
// use allowsync_core::RegistryStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RegistryStore implementation */;
//
//     let registry = store.load().await?;
//     println!("{} account(s) labeled {}", registry.accounts.len(), registry.label);
//
//     Ok(())
// }
// ```

use crate::accounts::Registry;
use async_trait::async_trait;

/// Trait for registry store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Create a default registry when none exists yet
///
/// ## Forbidden Capabilities
/// - ❌ Call backends or resolve IPs
/// - ❌ Spawn background tasks
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load the registry
    ///
    /// # Returns
    ///
    /// - `Ok(Registry)`: The stored registry (or a freshly created default)
    /// - `Err(Error)`: Storage error or unreadable document
    async fn load(&self) -> Result<Registry, crate::Error>;

    /// Replace the stored registry
    ///
    /// # Parameters
    ///
    /// - `registry`: The registry to persist
    async fn save(&self, registry: &Registry) -> Result<(), crate::Error>;
}
