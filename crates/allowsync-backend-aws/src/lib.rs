// # AWS Security-Group Backend
//
// This crate drives the `aws` CLI to manage inbound SSH rules of one EC2
// security group.
//
// ## Trust Level: Untrusted (Backend)
//
// **Allowed Capabilities**:
// - ✅ Run the `aws` CLI through the injected `CommandRunner`
// - ✅ Parse `--output json` responses
//
// **Forbidden Capabilities**:
// - ❌ Decide whether a mutation is needed (owned by `Reconciler`)
// - ❌ Retry failed commands
// - ❌ Spawn tasks or threads
//
// ## Ownership
//
// A rule belongs to us only when it is inbound, tcp, exactly port 22, and
// its description equals the label. Rules for other ports keep their
// description untouched even if it happens to match.
//
// ## CLI Reference
//
// - `aws ec2 describe-security-group-rules --filters Name=group-id,Values=G`
// - `aws ec2 authorize-security-group-ingress --group-id G --ip-permissions JSON`
// - `aws ec2 revoke-security-group-ingress --group-id G --security-group-rule-ids ID`

use allowsync_core::accounts::{Account, BackendKind, FirewallAccount};
use allowsync_core::registry::BackendRegistry;
use allowsync_core::traits::{
    AllowListBackend, AllowListEntry, CommandOutput, CommandRunner, ServiceScope,
    strip_host_suffix,
};
use allowsync_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::net::Ipv4Addr;
use std::sync::Arc;

const BACKEND_NAME: &str = "aws";

/// `describe-security-group-rules` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupRules {
    #[serde(default)]
    security_group_rules: Vec<SecurityGroupRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupRule {
    security_group_rule_id: String,
    ip_protocol: String,
    #[serde(default)]
    from_port: i32,
    #[serde(default)]
    to_port: i32,
    cidr_ipv4: Option<String>,
    description: Option<String>,
    #[serde(default)]
    is_egress: bool,
}

impl From<SecurityGroupRule> for AllowListEntry {
    fn from(rule: SecurityGroupRule) -> Self {
        AllowListEntry {
            identifier: rule.security_group_rule_id,
            address: rule.cidr_ipv4.as_deref().map(|c| strip_host_suffix(c).to_string()),
            label: rule.description,
            service: Some(ServiceScope {
                protocol: rule.ip_protocol,
                from_port: rule.from_port,
                to_port: rule.to_port,
            }),
        }
    }
}

/// `authorize-` / `revoke-security-group-ingress` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IngressResponse {
    #[serde(rename = "Return")]
    accepted: bool,
}

/// Security-group backend for firewall accounts
pub struct AwsBackend {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl AwsBackend {
    /// Create a backend that runs `program` through `runner`
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn group<'a>(&self, account: &'a Account) -> Result<&'a FirewallAccount> {
        account.as_firewall().ok_or_else(|| {
            Error::invalid_input(format!(
                "{} backend cannot manage {} account '{}'",
                BACKEND_NAME,
                account.kind(),
                account.name()
            ))
        })
    }

    async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.runner.run(&self.program, &args).await.map_err(|e| {
            Error::backend_unavailable(
                BACKEND_NAME,
                format!("failed to run {}: {}", self.program, e),
            )
        })
    }

    /// Run an ingress mutation and check the `Return` flag
    async fn mutate(&self, args: Vec<String>, what: &str) -> Result<()> {
        let output = self.run(args).await?;
        if !output.is_success() {
            return Err(Error::backend_mutation(BACKEND_NAME, output.failure_reason()));
        }

        let response: IngressResponse = serde_json::from_str(&output.stdout).map_err(|e| {
            Error::backend_mutation(BACKEND_NAME, format!("unexpected {} output: {}", what, e))
        })?;

        if !response.accepted {
            return Err(Error::backend_mutation(
                BACKEND_NAME,
                format!("{} returned false", what),
            ));
        }

        Ok(())
    }
}

/// `ec2 <command>` with the account's profile and region
fn ec2(command: &str, group: &FirewallAccount) -> Vec<String> {
    vec![
        "ec2".to_string(),
        command.to_string(),
        "--profile".to_string(),
        group.auth_profile.clone(),
        "--region".to_string(),
        group.region.clone(),
    ]
}

#[async_trait]
impl AllowListBackend for AwsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Firewall
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
            "sts".to_string(),
            "get-caller-identity".to_string(),
            "--profile".to_string(),
            account.auth_profile().to_string(),
        ];
        matches!(self.runner.run(&self.program, &args).await, Ok(output) if output.is_success())
    }

    async fn list_entries(&self, account: &Account) -> Result<Vec<AllowListEntry>> {
        let group = self.group(account)?;

        let mut args = ec2("describe-security-group-rules", group);
        args.extend([
            "--filters".to_string(),
            format!("Name=group-id,Values={}", group.security_group_id),
            "--output".to_string(),
            "json".to_string(),
        ]);

        let output = self.run(args).await?;
        if !output.is_success() {
            return Err(Error::backend_query(BACKEND_NAME, output.failure_reason()));
        }

        let rules: SecurityGroupRules = serde_json::from_str(&output.stdout).map_err(|e| {
            Error::backend_query(BACKEND_NAME, format!("unexpected describe output: {}", e))
        })?;

        Ok(rules
            .security_group_rules
            .into_iter()
            .filter(|rule| !rule.is_egress)
            .map(AllowListEntry::from)
            .collect())
    }

    async fn create_entry(&self, account: &Account, address: Ipv4Addr, label: &str) -> Result<()> {
        let group = self.group(account)?;
        let ssh = ServiceScope::ssh();

        let permissions = json!([{
            "IpProtocol": ssh.protocol,
            "FromPort": ssh.from_port,
            "ToPort": ssh.to_port,
            "IpRanges": [{
                "CidrIp": format!("{}/32", address),
                "Description": label,
            }],
        }]);

        let mut args = ec2("authorize-security-group-ingress", group);
        args.extend([
            "--group-id".to_string(),
            group.security_group_id.clone(),
            "--ip-permissions".to_string(),
            permissions.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ]);

        self.mutate(args, "authorize-security-group-ingress").await
    }

    async fn delete_entry(&self, account: &Account, identifier: &str) -> Result<()> {
        let group = self.group(account)?;

        let mut args = ec2("revoke-security-group-ingress", group);
        args.extend([
            "--group-id".to_string(),
            group.security_group_id.clone(),
            "--security-group-rule-ids".to_string(),
            identifier.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ]);

        self.mutate(args, "revoke-security-group-ingress").await
    }

    fn owns_entry(&self, entry: &AllowListEntry, label: &str) -> bool {
        entry.service.as_ref().is_some_and(ServiceScope::is_ssh) && entry.has_label(label)
    }
}

/// Register the AWS backend with a registry
pub fn register(
    registry: &BackendRegistry,
    program: impl Into<String>,
    runner: Arc<dyn CommandRunner>,
) {
    registry.register_backend(Arc::new(AwsBackend::new(program, runner)));
}
