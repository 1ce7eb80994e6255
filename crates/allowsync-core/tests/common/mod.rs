//! Test doubles and common utilities for contract tests
//!
//! `MockBackend` keeps allow-lists in memory per account and records every
//! call in order, so tests can assert both end state and call sequence.

#![allow(dead_code)]

use allowsync_core::accounts::{Account, BackendKind, DocumentDbAccount, FirewallAccount, Registry};
use allowsync_core::error::{Error, Result};
use allowsync_core::traits::{AllowListBackend, AllowListEntry, IpResolver};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A backend call, as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    List { account: String },
    Create { account: String, address: Ipv4Addr, label: String },
    Delete { account: String, identifier: String },
}

/// Which operation an injected failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Delete,
}

/// In-memory allow-list backend
///
/// Clones share state, so a test can register one clone and inspect another.
#[derive(Clone)]
pub struct MockBackend {
    kind: BackendKind,
    name: &'static str,
    entries: Arc<Mutex<HashMap<String, Vec<AllowListEntry>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    failures: Arc<Mutex<HashSet<(String, Op)>>>,
    unauthenticated: Arc<Mutex<HashSet<String>>>,
    installed: Arc<AtomicBool>,
    next_id: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(kind: BackendKind) -> Self {
        let name = match kind {
            BackendKind::DocumentDb => "mock-docs",
            BackendKind::Firewall => "mock-firewall",
        };

        Self {
            kind,
            name,
            entries: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            unauthenticated: Arc::new(Mutex::new(HashSet::new())),
            installed: Arc::new(AtomicBool::new(true)),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Pretend the CLI is missing
    pub fn uninstalled(self) -> Self {
        self.installed.store(false, Ordering::SeqCst);
        self
    }

    /// Seed an entry on an account's allow-list
    pub fn seed(&self, account: &str, identifier: &str, address: &str, label: Option<&str>) {
        self.entries
            .lock()
            .unwrap()
            .entry(account.to_string())
            .or_default()
            .push(AllowListEntry {
                identifier: identifier.to_string(),
                address: Some(address.to_string()),
                label: label.map(str::to_string),
                service: None,
            });
    }

    /// Make `op` fail for the named account
    pub fn fail(&self, account: &str, op: Op) {
        self.failures
            .lock()
            .unwrap()
            .insert((account.to_string(), op));
    }

    /// Make the auth probe fail for the named profile
    pub fn reject_profile(&self, profile: &str) {
        self.unauthenticated
            .lock()
            .unwrap()
            .insert(profile.to_string());
    }

    pub fn entries(&self, account: &str) -> Vec<AllowListEntry> {
        self.entries
            .lock()
            .unwrap()
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Entries carrying `label` on the named account
    pub fn labeled(&self, account: &str, label: &str) -> Vec<AllowListEntry> {
        self.entries(account)
            .into_iter()
            .filter(|entry| entry.has_label(label))
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls excluding probes and listings
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Create { .. } | Call::Delete { .. }))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, account: &str, op: Op) -> Result<()> {
        if self
            .failures
            .lock()
            .unwrap()
            .contains(&(account.to_string(), op))
        {
            let message = format!("injected {:?} failure", op);
            return Err(match op {
                Op::List => Error::backend_query(self.name, message),
                Op::Create | Op::Delete => Error::backend_mutation(self.name, message),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AllowListBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn backend_name(&self) -> &'static str {
        self.name
    }

    async fn probe_installed(&self) -> bool {
        self.record(Call::Probe);
        self.installed.load(Ordering::SeqCst)
    }

    async fn probe_authenticated(&self, account: &Account) -> bool {
        !self
            .unauthenticated
            .lock()
            .unwrap()
            .contains(account.auth_profile())
    }

    async fn list_entries(&self, account: &Account) -> Result<Vec<AllowListEntry>> {
        self.record(Call::List {
            account: account.name().to_string(),
        });
        self.check(account.name(), Op::List)?;
        Ok(self.entries(account.name()))
    }

    async fn create_entry(&self, account: &Account, address: Ipv4Addr, label: &str) -> Result<()> {
        self.record(Call::Create {
            account: account.name().to_string(),
            address,
            label: label.to_string(),
        });
        self.check(account.name(), Op::Create)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .entry(account.name().to_string())
            .or_default()
            .push(AllowListEntry {
                identifier: format!("entry-{}", id),
                address: Some(address.to_string()),
                label: Some(label.to_string()),
                service: None,
            });
        Ok(())
    }

    async fn delete_entry(&self, account: &Account, identifier: &str) -> Result<()> {
        self.record(Call::Delete {
            account: account.name().to_string(),
            identifier: identifier.to_string(),
        });
        self.check(account.name(), Op::Delete)?;

        let mut entries = self.entries.lock().unwrap();
        let list = entries.entry(account.name().to_string()).or_default();
        let before = list.len();
        list.retain(|entry| entry.identifier != identifier);
        if list.len() == before {
            return Err(Error::backend_mutation(
                self.name,
                format!("no entry {}", identifier),
            ));
        }
        Ok(())
    }
}

/// Resolver returning a fixed address, or failing
pub struct FakeResolver {
    ip: Option<Ipv4Addr>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn returning(ip: Ipv4Addr) -> Self {
        Self {
            ip: Some(ip),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ip: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for FakeResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip
            .ok_or_else(|| Error::resolution("all 3 lookup source(s) failed"))
    }

    fn resolver_name(&self) -> &'static str {
        "fake"
    }
}

pub const LABEL: &str = "MyDevMachine";

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

pub fn docs_account(name: &str) -> Account {
    Account::DocumentDb(DocumentDbAccount {
        name: name.to_string(),
        auth_profile: format!("{}-profile", name.to_lowercase()),
        project_id: format!("proj-{}", name.to_lowercase()),
    })
}

pub fn firewall_account(name: &str) -> Account {
    Account::Firewall(FirewallAccount {
        name: name.to_string(),
        auth_profile: format!("{}-profile", name.to_lowercase()),
        region: "us-east-1".to_string(),
        security_group_id: format!("sg-{}", name.to_lowercase()),
    })
}

pub fn registry_of(accounts: Vec<Account>) -> Registry {
    Registry {
        label: LABEL.to_string(),
        accounts,
    }
}
