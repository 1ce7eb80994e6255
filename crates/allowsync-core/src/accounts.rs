//! Account registry model
//!
//! The registry is the list of backend accounts whose allow-lists are kept
//! in sync, plus the one label shared by all of them. It is loaded once per
//! run through a [`RegistryStore`](crate::traits::RegistryStore) and treated
//! as read-only input by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when a fresh registry is created
pub const DEFAULT_LABEL: &str = "MyDevMachine";

/// The kind of backend an account lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Document-database access list (MongoDB Atlas)
    DocumentDb,
    /// Firewall ingress rules (AWS EC2 security groups)
    Firewall,
}

impl BackendKind {
    /// All kinds, in the order the engine processes them
    pub const ALL: [BackendKind; 2] = [BackendKind::DocumentDb, BackendKind::Firewall];

    /// Stable identifier used in logs and the registry file
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::DocumentDb => "document_db",
            BackendKind::Firewall => "firewall",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project on the document-database service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDbAccount {
    /// Friendly name shown in progress output
    pub name: String,
    /// Named CLI authentication profile
    pub auth_profile: String,
    /// Remote project whose access list is managed
    pub project_id: String,
}

/// A security group on the cloud compute provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallAccount {
    /// Friendly name shown in progress output
    pub name: String,
    /// Named CLI authentication profile
    pub auth_profile: String,
    /// Region the security group lives in
    pub region: String,
    /// Security group whose inbound rules are managed
    pub security_group_id: String,
}

/// One configured backend account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    DocumentDb(DocumentDbAccount),
    Firewall(FirewallAccount),
}

impl Account {
    /// Which backend this account belongs to
    pub fn kind(&self) -> BackendKind {
        match self {
            Account::DocumentDb(_) => BackendKind::DocumentDb,
            Account::Firewall(_) => BackendKind::Firewall,
        }
    }

    /// Friendly account name
    pub fn name(&self) -> &str {
        match self {
            Account::DocumentDb(a) => &a.name,
            Account::Firewall(a) => &a.name,
        }
    }

    /// CLI authentication profile
    pub fn auth_profile(&self) -> &str {
        match self {
            Account::DocumentDb(a) => &a.auth_profile,
            Account::Firewall(a) => &a.auth_profile,
        }
    }

    pub fn as_document_db(&self) -> Option<&DocumentDbAccount> {
        match self {
            Account::DocumentDb(a) => Some(a),
            Account::Firewall(_) => None,
        }
    }

    pub fn as_firewall(&self) -> Option<&FirewallAccount> {
        match self {
            Account::Firewall(a) => Some(a),
            Account::DocumentDb(_) => None,
        }
    }

    /// Validate that every routing field is present
    pub fn validate(&self) -> Result<(), crate::Error> {
        let fields: Vec<(&str, &str)> = match self {
            Account::DocumentDb(a) => vec![
                ("name", a.name.as_str()),
                ("auth_profile", a.auth_profile.as_str()),
                ("project_id", a.project_id.as_str()),
            ],
            Account::Firewall(a) => vec![
                ("name", a.name.as_str()),
                ("auth_profile", a.auth_profile.as_str()),
                ("region", a.region.as_str()),
                ("security_group_id", a.security_group_id.as_str()),
            ],
        };

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "{} account '{}' has an empty {}",
                    self.kind(),
                    self.name(),
                    field
                )));
            }
        }

        Ok(())
    }
}

impl From<DocumentDbAccount> for Account {
    fn from(account: DocumentDbAccount) -> Self {
        Account::DocumentDb(account)
    }
}

impl From<FirewallAccount> for Account {
    fn from(account: FirewallAccount) -> Self {
        Account::Firewall(account)
    }
}

/// Ordered set of accounts sharing one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Label identifying this machine's entry on every backend
    pub label: String,
    /// Accounts in registration order
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl Registry {
    /// Create an empty registry with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            accounts: Vec::new(),
        }
    }

    /// Append an account
    pub fn with_account(mut self, account: impl Into<Account>) -> Self {
        self.accounts.push(account.into());
        self
    }

    /// True when no account is registered
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Accounts of one kind, in registration order
    pub fn accounts_of(&self, kind: BackendKind) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(move |a| a.kind() == kind)
    }

    /// Validate the label and every account
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.label.trim().is_empty() {
            return Err(crate::Error::config("Registry label cannot be empty"));
        }

        for account in &self.accounts {
            account.validate()?;
        }

        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL)
    }
}
