//! Label-based reconciliation
//!
//! Given one account's allow-list, a label and the desired address, the
//! reconciler decides between three actions and performs it:
//!
//! ```text
//!   list entries ──► first entry owned under label?
//!                        │
//!          ┌─────────────┼───────────────────┐
//!          │ none        │ same address      │ other address
//!          ▼             ▼                   ▼
//!       create        no-op          delete old, create new
//!     (Created)     (Unchanged)           (Updated)
//! ```
//!
//! Entries are matched by label, never by address. Entries not owned under
//! the label are never modified.
//!
//! The replace path is two separate backend calls. If the delete succeeds
//! and the create fails, the account is left without a labeled entry until
//! the next run; the failure is reported and nothing is rolled back.

use crate::accounts::Account;
use crate::error::{Error, Result};
use crate::traits::{AllowListBackend, AllowListEntry};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What the reconciler decided to do for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction<'a> {
    /// No owned entry exists
    Create,
    /// The owned entry allows a different address
    Replace { entry: &'a AllowListEntry },
    /// The owned entry already allows the desired address
    Keep { entry: &'a AllowListEntry },
}

/// Result of reconciling one account
#[derive(Debug, Clone)]
pub enum ReconciliationOutcome {
    /// A new labeled entry was created
    Created { new_address: Ipv4Addr },
    /// The labeled entry was replaced
    Updated {
        /// Address the old entry allowed, if it had a single-host address
        previous_address: Option<String>,
        new_address: Ipv4Addr,
    },
    /// The labeled entry already allowed the desired address
    Unchanged { current_address: Ipv4Addr },
    /// Reconciliation did not complete
    Failed { error: Arc<Error> },
}

impl ReconciliationOutcome {
    /// Wrap an error as a failed outcome
    pub fn failed(error: Error) -> Self {
        Self::Failed {
            error: Arc::new(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short machine-friendly name of the outcome
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Unchanged { .. } => "unchanged",
            Self::Failed { .. } => "failed",
        }
    }

    /// The error, for failed outcomes
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed { error } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { new_address } => write!(f, "created {}", new_address),
            Self::Updated {
                previous_address,
                new_address,
            } => write!(
                f,
                "updated {} -> {}",
                previous_address.as_deref().unwrap_or("<none>"),
                new_address
            ),
            Self::Unchanged { current_address } => write!(f, "unchanged {}", current_address),
            Self::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Decide what to do with an account's entries
///
/// The first entry in listing order for which `owns` returns true is the
/// managed entry. Backends do not enforce label uniqueness; any further
/// owned entries are ignored.
pub fn plan<'a, F>(
    entries: &'a [AllowListEntry],
    desired: Ipv4Addr,
    owns: F,
) -> ReconcileAction<'a>
where
    F: Fn(&AllowListEntry) -> bool,
{
    let mut owned = entries.iter().filter(|entry| owns(entry));

    let Some(entry) = owned.next() else {
        return ReconcileAction::Create;
    };

    let extra = owned.count();
    if extra > 0 {
        debug!(
            "{} more entries share the label of {}, using the first",
            extra, entry.identifier
        );
    }

    if entry.allows(desired) {
        ReconcileAction::Keep { entry }
    } else {
        ReconcileAction::Replace { entry }
    }
}

/// Applies [`plan`] decisions through a backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    dry_run: bool,
}

impl Reconciler {
    /// Create a reconciler that mutates backends
    pub fn new() -> Self {
        Self { dry_run: false }
    }

    /// Create a reconciler that plans and reports but never mutates
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Reconcile one account
    ///
    /// # Parameters
    ///
    /// - `backend`: Adapter for the account's backend kind
    /// - `account`: The account to reconcile
    /// - `label`: Label identifying the managed entry
    /// - `desired`: Address the managed entry must allow
    ///
    /// # Returns
    ///
    /// - `Ok(outcome)`: Created, Updated or Unchanged (never Failed)
    /// - `Err(Error)`: Listing or a mutation failed
    pub async fn reconcile(
        &self,
        backend: &dyn AllowListBackend,
        account: &Account,
        label: &str,
        desired: Ipv4Addr,
    ) -> Result<ReconciliationOutcome> {
        let entries = backend.list_entries(account).await?;
        debug!(
            "{} entries on {} account '{}'",
            entries.len(),
            backend.backend_name(),
            account.name()
        );

        match plan(&entries, desired, |entry| backend.owns_entry(entry, label)) {
            ReconcileAction::Keep { .. } => {
                debug!("'{}' already allows {} under '{}'", account.name(), desired, label);
                Ok(ReconciliationOutcome::Unchanged {
                    current_address: desired,
                })
            }

            ReconcileAction::Create => {
                if self.dry_run {
                    info!(
                        "[DRY-RUN] Would create '{}' -> {} on '{}'",
                        label,
                        desired,
                        account.name()
                    );
                } else {
                    backend.create_entry(account, desired, label).await?;
                    info!("Created '{}' -> {} on '{}'", label, desired, account.name());
                }
                Ok(ReconciliationOutcome::Created {
                    new_address: desired,
                })
            }

            ReconcileAction::Replace { entry } => {
                let previous_address = entry.address.clone();

                if self.dry_run {
                    info!(
                        "[DRY-RUN] Would replace {} with {} under '{}' on '{}'",
                        entry.identifier,
                        desired,
                        label,
                        account.name()
                    );
                } else {
                    backend.delete_entry(account, &entry.identifier).await?;
                    debug!("Deleted {} from '{}'", entry.identifier, account.name());

                    if let Err(e) = backend.create_entry(account, desired, label).await {
                        error!(
                            "'{}' lost its '{}' entry: deleted {} but creating {} failed: {}",
                            account.name(),
                            label,
                            entry.identifier,
                            desired,
                            e
                        );
                        return Err(Error::backend_mutation(
                            backend.backend_name(),
                            format!(
                                "removed {} but could not create {}: {}",
                                entry.identifier, desired, e
                            ),
                        ));
                    }

                    info!(
                        "Updated '{}' on '{}': {} -> {}",
                        label,
                        account.name(),
                        previous_address.as_deref().unwrap_or("<none>"),
                        desired
                    );
                }

                Ok(ReconciliationOutcome::Updated {
                    previous_address,
                    new_address: desired,
                })
            }
        }
    }
}
