//! Core traits for allowsync
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Determine the current public IPv4 address
//! - [`AllowListBackend`]: List and mutate one platform's allow-list
//! - [`CommandRunner`]: Run a backend's CLI
//! - [`RegistryStore`]: Load and save the account registry

pub mod ip_resolver;
pub mod backend;
pub mod command_runner;
pub mod registry_store;

pub use ip_resolver::{IpResolver, parse_ipv4_literal};
pub use backend::{AllowListBackend, AllowListEntry, ServiceScope, strip_host_suffix};
pub use command_runner::{CommandRunner, CommandOutput};
pub use registry_store::RegistryStore;
