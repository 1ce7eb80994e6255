// # MongoDB Atlas Access-List Backend
//
// This crate drives the `atlas` CLI to manage one project's IP access list.
//
// ## Trust Level: Untrusted (Backend)
//
// **Allowed Capabilities**:
// - ✅ Run the `atlas` CLI through the injected `CommandRunner`
// - ✅ Parse `--output json` responses
//
// **Forbidden Capabilities**:
// - ❌ Decide whether a mutation is needed (owned by `Reconciler`)
// - ❌ Retry failed commands
// - ❌ Spawn tasks or threads
//
// ## Entry Shape
//
// Access-list entries carry either `ipAddress` or `cidrBlock`, plus an
// optional `comment`. The comment is the label. A single-host `cidrBlock`
// (`/32`) is treated as the bare address, both for matching and as the
// identifier passed to `accessLists delete`.
//
// ## CLI Reference
//
// - `atlas accessLists list --projectId ID --output json`
// - `atlas accessLists create IP --projectId ID --comment LABEL --output json`
// - `atlas accessLists delete ENTRY --projectId ID --force`

use allowsync_core::accounts::{Account, BackendKind, DocumentDbAccount};
use allowsync_core::registry::BackendRegistry;
use allowsync_core::traits::{
    AllowListBackend, AllowListEntry, CommandOutput, CommandRunner, strip_host_suffix,
};
use allowsync_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::sync::Arc;

const BACKEND_NAME: &str = "atlas";

/// `atlas accessLists list` response
#[derive(Debug, Deserialize)]
struct AccessListPage {
    #[serde(default)]
    results: Vec<AccessListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessListEntry {
    ip_address: Option<String>,
    cidr_block: Option<String>,
    comment: Option<String>,
}

impl AccessListEntry {
    fn into_entry(self) -> Option<AllowListEntry> {
        let address = match self.ip_address {
            Some(ip) => ip,
            None => strip_host_suffix(self.cidr_block.as_deref()?).to_string(),
        };

        Some(AllowListEntry {
            identifier: address.clone(),
            address: Some(address),
            label: self.comment,
            service: None,
        })
    }
}

/// Access-list backend for document-database projects
pub struct AtlasBackend {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl AtlasBackend {
    /// Create a backend that runs `program` through `runner`
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn project<'a>(&self, account: &'a Account) -> Result<&'a DocumentDbAccount> {
        account.as_document_db().ok_or_else(|| {
            Error::invalid_input(format!(
                "{} backend cannot manage {} account '{}'",
                BACKEND_NAME,
                account.kind(),
                account.name()
            ))
        })
    }

    /// Run the CLI, mapping spawn failures to `BackendUnavailable`
    async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.runner.run(&self.program, &args).await.map_err(|e| {
            Error::backend_unavailable(
                BACKEND_NAME,
                format!("failed to run {}: {}", self.program, e),
            )
        })
    }
}

fn scoped(mut args: Vec<String>, project: &DocumentDbAccount) -> Vec<String> {
    args.extend([
        "--profile".to_string(),
        project.auth_profile.clone(),
        "--projectId".to_string(),
        project.project_id.clone(),
    ]);
    args
}

#[async_trait]
impl AllowListBackend for AtlasBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentDb
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn probe_installed(&self) -> bool {
        match self.runner.run(&self.program, &["--version".to_string()]).await {
            Ok(output) => output.is_success(),
            Err(e) => {
                tracing::debug!("{} --version failed: {}", self.program, e);
                false
            }
        }
    }

    async fn probe_authenticated(&self, account: &Account) -> bool {
        let args = vec![
            "config".to_string(),
            "list".to_string(),
            "--profile".to_string(),
            account.auth_profile().to_string(),
        ];
        matches!(self.runner.run(&self.program, &args).await, Ok(output) if output.is_success())
    }

    async fn list_entries(&self, account: &Account) -> Result<Vec<AllowListEntry>> {
        let project = self.project(account)?;

        let mut args = scoped(vec!["accessLists".to_string(), "list".to_string()], project);
        args.extend(["--output".to_string(), "json".to_string()]);

        let output = self.run(args).await?;
        if !output.is_success() {
            return Err(Error::backend_query(BACKEND_NAME, output.failure_reason()));
        }

        let page: AccessListPage = serde_json::from_str(&output.stdout).map_err(|e| {
            Error::backend_query(BACKEND_NAME, format!("unexpected list output: {}", e))
        })?;

        let entries: Vec<AllowListEntry> = page
            .results
            .into_iter()
            .filter_map(AccessListEntry::into_entry)
            .collect();

        tracing::trace!(
            "Project {} has {} access-list entries",
            project.project_id,
            entries.len()
        );
        Ok(entries)
    }

    async fn create_entry(&self, account: &Account, address: Ipv4Addr, label: &str) -> Result<()> {
        let project = self.project(account)?;

        let mut args = scoped(
            vec![
                "accessLists".to_string(),
                "create".to_string(),
                address.to_string(),
            ],
            project,
        );
        args.extend([
            "--comment".to_string(),
            label.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ]);

        let output = self.run(args).await?;
        if !output.is_success() {
            return Err(Error::backend_mutation(BACKEND_NAME, output.failure_reason()));
        }

        serde_json::from_str::<serde_json::Value>(&output.stdout).map_err(|e| {
            Error::backend_mutation(BACKEND_NAME, format!("unexpected create output: {}", e))
        })?;

        Ok(())
    }

    async fn delete_entry(&self, account: &Account, identifier: &str) -> Result<()> {
        let project = self.project(account)?;

        let mut args = scoped(
            vec![
                "accessLists".to_string(),
                "delete".to_string(),
                identifier.to_string(),
            ],
            project,
        );
        args.push("--force".to_string());

        let output = self.run(args).await?;
        if !output.is_success() {
            return Err(Error::backend_mutation(BACKEND_NAME, output.failure_reason()));
        }

        Ok(())
    }
}

/// Register the Atlas backend with a registry
pub fn register(
    registry: &BackendRegistry,
    program: impl Into<String>,
    runner: Arc<dyn CommandRunner>,
) {
    registry.register_backend(Arc::new(AtlasBackend::new(program, runner)));
}
