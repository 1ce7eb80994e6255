// # Allow-List Backend Trait
//
// Defines the interface for reading and mutating one platform's allow-list.
//
// ## Implementations
//
// - MongoDB Atlas project access lists: `allowsync-backend-atlas` crate
// - AWS EC2 security-group ingress rules: `allowsync-backend-aws` crate
//
// ## Usage
//
// ```rust,ignore
// use allowsync_core::AllowListBackend;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let backend = /* AllowListBackend implementation */;
//
//     for entry in backend.list_entries(&account).await? {
//         if backend.owns_entry(&entry, "MyDevMachine") {
//             println!("ours: {:?}", entry.address);
//         }
//     }
//
//     Ok(())
// }
// ```

use crate::accounts::{Account, BackendKind};
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Protocol and port range of a firewall rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScope {
    /// IP protocol as reported by the backend (e.g. "tcp", "-1")
    pub protocol: String,
    /// First port of the range
    pub from_port: i32,
    /// Last port of the range
    pub to_port: i32,
}

impl ServiceScope {
    /// Inbound SSH: tcp, exactly port 22
    pub fn ssh() -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: 22,
            to_port: 22,
        }
    }

    /// True for tcp with the port range exactly 22-22
    pub fn is_ssh(&self) -> bool {
        self.protocol == "tcp" && self.from_port == 22 && self.to_port == 22
    }
}

/// One entry of a backend allow-list, normalized across backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    /// Backend-assigned identifier used to delete the entry
    /// (security-group rule id, or the access-list IP/CIDR literal)
    pub identifier: String,
    /// Allowed address with any single-host `/32` suffix stripped
    pub address: Option<String>,
    /// Comment or description carried by the entry
    pub label: Option<String>,
    /// Protocol and ports, for backends whose entries are scoped to a service
    pub service: Option<ServiceScope>,
}

impl AllowListEntry {
    /// Whether the entry carries exactly this label
    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }

    /// Whether the entry allows exactly this single address
    pub fn allows(&self, address: Ipv4Addr) -> bool {
        self.address.as_deref() == Some(address.to_string().as_str())
    }
}

/// Strip the single-host `/32` suffix some backends append to addresses
pub fn strip_host_suffix(cidr: &str) -> &str {
    cidr.strip_suffix("/32").unwrap_or(cidr)
}

/// Trait for allow-list backend implementations
///
/// # Trust Level: Untrusted
///
/// Backends are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Invoke their platform's CLI through the injected `CommandRunner`
/// - ✅ Parse platform-specific JSON output into `AllowListEntry`
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Decide whether a mutation is needed (owned by `Reconciler`)
/// - ❌ Retry failed calls or sleep
/// - ❌ Touch accounts of another backend kind
/// - ❌ Cache entries beyond a single call
///
/// An adapter handed an account of the wrong kind must fail with
/// `Error::InvalidInput` without spawning anything.
#[async_trait]
pub trait AllowListBackend: Send + Sync {
    /// Which account kind this backend serves
    fn kind(&self) -> BackendKind;

    /// Get the backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;

    /// Check whether the backend CLI is installed and runnable
    async fn probe_installed(&self) -> bool;

    /// Check whether the account's auth profile is usable
    ///
    /// Backends without a cheap identity check may keep the default.
    async fn probe_authenticated(&self, _account: &Account) -> bool {
        true
    }

    /// List the account's allow-list entries in backend order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<AllowListEntry>)`: Every entry, labeled or not
    /// - `Err(Error::BackendUnavailable)`: The CLI could not be started
    /// - `Err(Error::BackendQuery)`: The CLI failed or its output was malformed
    async fn list_entries(&self, account: &Account) -> Result<Vec<AllowListEntry>, crate::Error>;

    /// Allow `address` as a single host, carrying `label` as its comment
    async fn create_entry(
        &self,
        account: &Account,
        address: Ipv4Addr,
        label: &str,
    ) -> Result<(), crate::Error>;

    /// Remove exactly the entry with this identifier
    async fn delete_entry(&self, account: &Account, identifier: &str) -> Result<(), crate::Error>;

    /// Whether `entry` is the one this system manages under `label`
    ///
    /// The default is an exact, case-sensitive comparison of the comment.
    fn owns_entry(&self, entry: &AllowListEntry, label: &str) -> bool {
        entry.has_label(label)
    }
}
