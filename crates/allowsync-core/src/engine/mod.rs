//! Batch sync engine
//!
//! The SyncEngine is responsible for:
//! - Walking the account registry one backend kind at a time
//! - Failing a whole kind fast when its CLI is unavailable
//! - Reconciling each account strictly in sequence
//! - Turning per-account errors into `Failed` outcomes
//! - Emitting progress events and returning a [`RunSummary`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐
//! │ Registry │   │ resolved IP │
//! └──────────┘   └─────────────┘
//!       │               │
//!       └───────┬───────┘
//!               ▼
//!        ┌────────────┐        ┌────────────┐
//!        │ SyncEngine │──────► │  Events    │
//!        └────────────┘        │ (progress) │
//!               │              └────────────┘
//!               ▼  one account at a time
//!        ┌────────────┐        ┌──────────────────┐
//!        │ Reconciler │──────► │ AllowListBackend │
//!        └────────────┘        └──────────────────┘
//! ```
//!
//! Accounts never run concurrently. The only ordering that matters for
//! correctness is list → delete → create within one account; running
//! accounts one by one keeps that order and keeps progress output
//! attributable to one account at a time.

use crate::accounts::{Account, BackendKind, Registry};
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::reconcile::{Reconciler, ReconciliationOutcome};
use crate::registry::BackendRegistry;
use crate::traits::{AllowListBackend, IpResolver};
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Events emitted by the SyncEngine
///
/// Delivery is best effort. [`RunSummary`] is the complete record of a run.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Run started
    RunStarted {
        resolved_ip: Ipv4Addr,
        accounts_count: usize,
        dry_run: bool,
    },

    /// Processing of one backend kind started
    BackendStarted {
        kind: BackendKind,
        accounts_count: usize,
    },

    /// A backend kind is unusable; all its accounts fail
    BackendUnavailable { kind: BackendKind, reason: String },

    /// Reconciliation of an account started
    AccountStarted { account: Account },

    /// An account reached its outcome
    AccountFinished {
        account: Account,
        outcome: ReconciliationOutcome,
    },

    /// Run finished
    RunFinished {
        accounts_count: usize,
        failed_count: usize,
    },
}

/// Outcome of one account within a run
#[derive(Debug, Clone)]
pub struct AccountReport {
    pub account: Account,
    pub outcome: ReconciliationOutcome,
}

/// Aggregated result of one batch run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Address every account was reconciled against
    pub resolved_ip: Ipv4Addr,
    /// Label shared by the managed entries
    pub label: String,
    /// Whether mutations were skipped
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-account outcomes, grouped by backend kind in processing order
    pub per_account: Vec<AccountReport>,
}

impl RunSummary {
    /// Number of `Failed` outcomes
    pub fn failed_count(&self) -> usize {
        self.per_account
            .iter()
            .filter(|report| report.outcome.is_failed())
            .count()
    }

    /// Number of outcomes with the given name (`created`, `updated`, ...)
    pub fn count(&self, outcome: &str) -> usize {
        self.per_account
            .iter()
            .filter(|report| report.outcome.as_str() == outcome)
            .count()
    }

    /// True only if no account failed
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit code for this run: 0 on success, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Outcome recorded for the named account, if any
    pub fn outcome_for(&self, account_name: &str) -> Option<&ReconciliationOutcome> {
        self.per_account
            .iter()
            .find(|report| report.account.name() == account_name)
            .map(|report| &report.outcome)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

/// Batch sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`], keeping the event receiver
/// 2. Call [`SyncEngine::run()`] once per resolved IP
/// 3. Drop the engine to close the event channel
///
/// ## Failure isolation
///
/// An error while processing one account becomes that account's `Failed`
/// outcome. It never aborts the batch and never affects the next account.
pub struct SyncEngine {
    /// Adapters per backend kind
    backends: BackendRegistry,

    /// Applies the per-account decision
    reconciler: Reconciler,

    /// Check each account's auth profile first
    probe_profiles: bool,

    /// Event sender for progress reporting
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `backends`: Registered adapters
    /// - `config`: Batch settings
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields progress events
    pub fn new(
        backends: BackendRegistry,
        config: &BatchConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = if config.dry_run {
            Reconciler::dry_run()
        } else {
            Reconciler::new()
        };

        let engine = Self {
            backends,
            reconciler,
            probe_profiles: config.probe_profiles,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Reconcile every account in the registry against `resolved_ip`
    ///
    /// Backend kinds are processed in [`BackendKind::ALL`] order and
    /// accounts in registry order within a kind.
    pub async fn run(&self, registry: &Registry, resolved_ip: Ipv4Addr) -> RunSummary {
        let started_at = Utc::now();
        self.emit_event(SyncEvent::RunStarted {
            resolved_ip,
            accounts_count: registry.accounts.len(),
            dry_run: self.reconciler.is_dry_run(),
        });

        let mut per_account = Vec::with_capacity(registry.accounts.len());

        for kind in BackendKind::ALL {
            let accounts: Vec<&Account> = registry.accounts_of(kind).collect();
            if accounts.is_empty() {
                continue;
            }

            self.emit_event(SyncEvent::BackendStarted {
                kind,
                accounts_count: accounts.len(),
            });

            match self.available_backend(kind).await {
                Ok(backend) => {
                    for account in accounts {
                        let outcome = self
                            .reconcile_account(
                                backend.as_ref(),
                                account,
                                &registry.label,
                                resolved_ip,
                            )
                            .await;
                        per_account.push(self.finish_account(account, outcome));
                    }
                }
                Err(e) => {
                    warn!("Skipping {} account(s) on {}: {}", accounts.len(), kind, e);
                    self.emit_event(SyncEvent::BackendUnavailable {
                        kind,
                        reason: e.to_string(),
                    });

                    let error = Arc::new(e);
                    for account in accounts {
                        let outcome = ReconciliationOutcome::Failed {
                            error: Arc::clone(&error),
                        };
                        per_account.push(self.finish_account(account, outcome));
                    }
                }
            }
        }

        let summary = RunSummary {
            resolved_ip,
            label: registry.label.clone(),
            dry_run: self.reconciler.is_dry_run(),
            started_at,
            finished_at: Utc::now(),
            per_account,
        };

        info!(
            "Run finished: {} account(s), {} failed",
            summary.per_account.len(),
            summary.failed_count()
        );
        self.emit_event(SyncEvent::RunFinished {
            accounts_count: summary.per_account.len(),
            failed_count: summary.failed_count(),
        });

        summary
    }

    /// Resolve the public IP, then reconcile every account against it
    ///
    /// A resolution failure aborts before any backend is called.
    pub async fn resolve_and_run(
        &self,
        resolver: &dyn IpResolver,
        registry: &Registry,
    ) -> Result<RunSummary> {
        let resolved_ip = resolver.resolve().await?;
        info!("Resolved public IP {} via {}", resolved_ip, resolver.resolver_name());
        Ok(self.run(registry, resolved_ip).await)
    }

    /// Find the backend for `kind` and check its CLI is installed
    ///
    /// Called once per kind, before any account of that kind is touched.
    async fn available_backend(&self, kind: BackendKind) -> Result<Arc<dyn AllowListBackend>> {
        let backend = self.backends.get(kind).ok_or_else(|| {
            Error::backend_unavailable(kind.as_str(), "no backend registered for this account kind")
        })?;

        if !backend.probe_installed().await {
            return Err(Error::backend_unavailable(
                backend.backend_name(),
                format!("{} CLI is not installed", backend.backend_name()),
            ));
        }

        Ok(backend)
    }

    /// Reconcile a single account, converting any error into `Failed`
    async fn reconcile_account(
        &self,
        backend: &dyn AllowListBackend,
        account: &Account,
        label: &str,
        resolved_ip: Ipv4Addr,
    ) -> ReconciliationOutcome {
        self.emit_event(SyncEvent::AccountStarted {
            account: account.clone(),
        });

        if self.probe_profiles && !backend.probe_authenticated(account).await {
            return ReconciliationOutcome::failed(Error::backend_unavailable(
                backend.backend_name(),
                format!("profile '{}' is not authenticated", account.auth_profile()),
            ));
        }

        match self
            .reconciler
            .reconcile(backend, account, label, resolved_ip)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to reconcile '{}': {}", account.name(), e);
                ReconciliationOutcome::failed(e)
            }
        }
    }

    fn finish_account(&self, account: &Account, outcome: ReconciliationOutcome) -> AccountReport {
        debug!("'{}' -> {}", account.name(), outcome);
        self.emit_event(SyncEvent::AccountFinished {
            account: account.clone(),
            outcome: outcome.clone(),
        });

        AccountReport {
            account: account.clone(),
            outcome,
        }
    }

    /// Emit a progress event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            // The event will be dropped; reconciliation never waits on a reader
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event (event_channel_capacity)");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("No event listener, dropping event");
            }
        }
    }
}
