// # allowsync-core
//
// Core library for keeping this machine's public IP on remote allow-lists.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for discovering the current public IPv4 address
// - **AllowListBackend**: Trait for listing, creating and deleting allow-list entries
// - **CommandRunner**: Seam between backends and the platform CLIs they drive
// - **RegistryStore**: Trait for loading the account registry
// - **Reconciler**: Label-based create / replace / keep decision for one account
// - **SyncEngine**: Sequential batch run over every registered account
// - **BackendRegistry**: Plugin-based registry of backends by account kind
//
// ## Design Principles
//
// 1. **Label ownership**: Only the entry carrying the configured label is ever touched
// 2. **Failure isolation**: One account's failure never stops the batch
// 3. **Plugin-Based**: Backends are registered at startup, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library

pub mod accounts;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use accounts::{Account, BackendKind, DocumentDbAccount, FirewallAccount, Registry};
pub use config::{BatchConfig, ResolverConfig, SyncConfig, ToolsConfig};
pub use engine::{AccountReport, RunSummary, SyncEngine, SyncEvent};
pub use error::{Error, Result};
pub use exec::TokioCommandRunner;
pub use reconcile::{ReconcileAction, Reconciler, ReconciliationOutcome};
pub use registry::BackendRegistry;
pub use store::{FileRegistryStore, MemoryRegistryStore};
pub use traits::{
    AllowListBackend, AllowListEntry, CommandOutput, CommandRunner, IpResolver, RegistryStore,
};
