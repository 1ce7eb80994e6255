//! Human-readable progress report
//!
//! The per-account report is rendered from the [`RunSummary`] the engine
//! returns, so every account gets exactly one line. Engine events are only
//! mirrored into the log while the run is in flight. Logs go to stderr and
//! the report to stdout, so the report stays readable at any log level.

use allowsync_core::{Account, BackendKind, ReconciliationOutcome, RunSummary, SyncEvent};
use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// Mirror engine events into the log until the engine drops its sender
pub async fn log_progress(events: mpsc::Receiver<SyncEvent>) {
    let mut events = ReceiverStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            SyncEvent::BackendStarted {
                kind,
                accounts_count,
            } => info!("Processing {} {} account(s)", accounts_count, kind),
            SyncEvent::AccountStarted { account } => {
                info!("Reconciling [{}] {}", account.auth_profile(), account.name())
            }
            other => debug!("{:?}", other),
        }
    }
}

fn section_title(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::DocumentDb => "📦 MongoDB Atlas access lists",
        BackendKind::Firewall => "🔐 AWS security groups (SSH)",
    }
}

/// Full report for a finished run: header, one section per backend kind,
/// one line per account
pub fn render(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        format!("🌐 Current public IP: {}", summary.resolved_ip),
        format!(
            "🏷️  Label: \"{}\" ({} account(s))",
            summary.label,
            summary.per_account.len()
        ),
    ];
    if summary.dry_run {
        lines.push("🧪 Dry run: no allow-list was changed".to_string());
    }

    let mut current: Option<BackendKind> = None;
    for report in &summary.per_account {
        let kind = report.account.kind();
        if current != Some(kind) {
            let in_section = summary
                .per_account
                .iter()
                .filter(|r| r.account.kind() == kind)
                .count();
            lines.push(String::new());
            lines.push(format!("{} ({})", section_title(kind), in_section));
            current = Some(kind);
        }
        lines.push(account_line(&report.account, &summary.label, &report.outcome));
    }

    lines
}

/// Address as the backend shows it
fn shown(account: &Account, address: &str) -> String {
    match account {
        Account::Firewall(_) if !address.contains('/') => format!("{}/32", address),
        _ => address.to_string(),
    }
}

fn shown_ip(account: &Account, address: Ipv4Addr) -> String {
    shown(account, &address.to_string())
}

/// One report line, e.g. `[dev] Analytics... ✅ Created "MyDevMachine" → 203.0.113.5`
pub fn account_line(account: &Account, label: &str, outcome: &ReconciliationOutcome) -> String {
    let (prefix, subject) = match account {
        Account::DocumentDb(a) => (format!("[{}] {}...", a.auth_profile, a.name), ""),
        Account::Firewall(a) => (
            format!(
                "[{}] {} ({})...",
                a.auth_profile, a.name, a.security_group_id
            ),
            "SSH rule ",
        ),
    };

    let status = match outcome {
        ReconciliationOutcome::Created { new_address } => format!(
            "✅ Created {}\"{}\" → {}",
            subject,
            label,
            shown_ip(account, *new_address)
        ),
        ReconciliationOutcome::Updated {
            previous_address,
            new_address,
        } => format!(
            "✅ Updated {}\"{}\": {} → {}",
            subject,
            label,
            previous_address
                .as_deref()
                .map(|a| shown(account, a))
                .unwrap_or_else(|| "?".to_string()),
            shown_ip(account, *new_address)
        ),
        ReconciliationOutcome::Unchanged { current_address } => {
            format!("⏭️  Unchanged (already {})", shown_ip(account, *current_address))
        }
        ReconciliationOutcome::Failed { error } => format!("❌ Failed: {}", error),
    };

    format!("{} {}", prefix, status)
}

/// Final summary line
pub fn summary_line(summary: &RunSummary) -> String {
    let prefix = if summary.dry_run {
        "Dry run finished"
    } else {
        "Done"
    };
    format!(
        "{}: {} created, {} updated, {} unchanged, {} failed",
        prefix,
        summary.count("created"),
        summary.count("updated"),
        summary.count("unchanged"),
        summary.failed_count()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use allowsync_core::{AccountReport, DocumentDbAccount, Error, FirewallAccount};
    use chrono::Utc;
    use std::sync::Arc;

    fn docs(name: &str) -> Account {
        Account::DocumentDb(DocumentDbAccount {
            name: name.to_string(),
            auth_profile: "dev".to_string(),
            project_id: "p1".to_string(),
        })
    }

    fn firewall(name: &str) -> Account {
        Account::Firewall(FirewallAccount {
            name: name.to_string(),
            auth_profile: "prod".to_string(),
            region: "us-east-1".to_string(),
            security_group_id: "sg-0123".to_string(),
        })
    }

    fn summary_of(per_account: Vec<AccountReport>) -> RunSummary {
        let now = Utc::now();
        RunSummary {
            resolved_ip: Ipv4Addr::new(203, 0, 113, 5),
            label: "MyDevMachine".to_string(),
            dry_run: false,
            started_at: now,
            finished_at: now,
            per_account,
        }
    }

    #[test]
    fn test_account_lines() {
        let ip = Ipv4Addr::new(203, 0, 113, 5);

        assert_eq!(
            account_line(
                &docs("Analytics"),
                "MyDevMachine",
                &ReconciliationOutcome::Created { new_address: ip }
            ),
            "[dev] Analytics... ✅ Created \"MyDevMachine\" → 203.0.113.5"
        );

        assert_eq!(
            account_line(
                &docs("Analytics"),
                "x",
                &ReconciliationOutcome::Unchanged {
                    current_address: ip
                }
            ),
            "[dev] Analytics... ⏭️  Unchanged (already 203.0.113.5)"
        );

        let failed = ReconciliationOutcome::failed(Error::backend_query("atlas", "unauthorized"));
        assert!(
            account_line(&docs("Analytics"), "x", &failed)
                .ends_with("❌ Failed: Backend query failed (atlas): unauthorized")
        );
    }

    #[test]
    fn test_firewall_lines_name_the_ssh_rule() {
        let ip = Ipv4Addr::new(203, 0, 113, 5);

        assert_eq!(
            account_line(
                &firewall("Bastion"),
                "MyDevMachine",
                &ReconciliationOutcome::Created { new_address: ip }
            ),
            "[prod] Bastion (sg-0123)... ✅ Created SSH rule \"MyDevMachine\" → 203.0.113.5/32"
        );

        assert_eq!(
            account_line(
                &firewall("Bastion"),
                "MyDevMachine",
                &ReconciliationOutcome::Updated {
                    previous_address: Some("198.51.100.9".to_string()),
                    new_address: ip,
                }
            ),
            "[prod] Bastion (sg-0123)... \
             ✅ Updated SSH rule \"MyDevMachine\": 198.51.100.9/32 → 203.0.113.5/32"
        );

        assert_eq!(
            account_line(
                &firewall("Bastion"),
                "MyDevMachine",
                &ReconciliationOutcome::Unchanged {
                    current_address: ip
                }
            ),
            "[prod] Bastion (sg-0123)... ⏭️  Unchanged (already 203.0.113.5/32)"
        );
    }

    #[test]
    fn test_every_account_gets_exactly_one_line() {
        let ip = Ipv4Addr::new(203, 0, 113, 5);
        let unavailable = Arc::new(Error::backend_unavailable("aws", "aws CLI is not installed"));

        let mut per_account = vec![AccountReport {
            account: docs("Analytics"),
            outcome: ReconciliationOutcome::Created { new_address: ip },
        }];
        per_account.extend((0..300).map(|i| AccountReport {
            account: firewall(&format!("Host{}", i)),
            outcome: ReconciliationOutcome::Failed {
                error: Arc::clone(&unavailable),
            },
        }));

        let lines = render(&summary_of(per_account));

        assert_eq!(
            lines.iter().filter(|l| l.contains("Analytics...")).count(),
            1
        );
        for i in 0..300 {
            let marker = format!("] Host{} (", i);
            assert_eq!(
                lines.iter().filter(|l| l.contains(&marker)).count(),
                1,
                "Host{} should have one line",
                i
            );
        }
        assert_eq!(lines.iter().filter(|l| l.contains("❌ Failed")).count(), 300);
    }

    #[test]
    fn test_render_sections_follow_processing_order() {
        let ip = Ipv4Addr::new(203, 0, 113, 5);
        let lines = render(&summary_of(vec![
            AccountReport {
                account: docs("Analytics"),
                outcome: ReconciliationOutcome::Created { new_address: ip },
            },
            AccountReport {
                account: firewall("Bastion"),
                outcome: ReconciliationOutcome::Unchanged {
                    current_address: ip,
                },
            },
        ]));

        assert_eq!(lines[0], "🌐 Current public IP: 203.0.113.5");
        assert_eq!(lines[1], "🏷️  Label: \"MyDevMachine\" (2 account(s))");
        assert_eq!(lines[3], "📦 MongoDB Atlas access lists (1)");
        assert!(lines[4].starts_with("[dev] Analytics..."));
        assert_eq!(lines[6], "🔐 AWS security groups (SSH) (1)");
        assert!(lines[7].starts_with("[prod] Bastion (sg-0123)..."));
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_summary_line() {
        let ip = Ipv4Addr::new(203, 0, 113, 5);
        let summary = summary_of(vec![AccountReport {
            account: docs("Analytics"),
            outcome: ReconciliationOutcome::Created { new_address: ip },
        }]);
        assert_eq!(
            summary_line(&summary),
            "Done: 1 created, 0 updated, 0 unchanged, 0 failed"
        );
    }
}
