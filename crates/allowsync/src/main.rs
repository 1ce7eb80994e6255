// # allowsync - allow-list sync
//
// The allowsync binary is a thin integration layer:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Loading the account registry and registering backends
// 4. Running one batch through the core engine and reporting it
//
// All reconciliation logic lives in allowsync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `ALLOWSYNC_REGISTRY_PATH`: Registry document (default: allowsync.json)
// - `ALLOWSYNC_IP_SOURCES`: Comma-separated lookup URLs, tried in order
// - `ALLOWSYNC_HTTP_TIMEOUT_SECS`: Per-lookup timeout, 1-120 (default: 10)
// - `ALLOWSYNC_ATLAS_BIN`: MongoDB Atlas CLI program (default: atlas)
// - `ALLOWSYNC_AWS_BIN`: AWS CLI program (default: aws)
// - `ALLOWSYNC_MODE`: `live` or `dry-run` (default: live)
// - `ALLOWSYNC_PROBE_PROFILES`: Check each auth profile first (default: false)
// - `ALLOWSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: warn)
//
// ## Example
//
// ```bash
// export ALLOWSYNC_REGISTRY_PATH=$HOME/.config/allowsync/allowsync.json
// export ALLOWSYNC_MODE=dry-run
//
// allowsync
// ```
//
// ## Exit Codes
//
// - 0: Every account is Created, Updated or Unchanged
// - 1: Any account failed, the IP could not be resolved, the registry is
//   empty or unreadable, or the configuration is invalid

mod report;

use allowsync_core::config::{BatchConfig, ResolverConfig, SyncConfig, ToolsConfig};
use allowsync_core::{BackendKind, BackendRegistry, FileRegistryStore, RegistryStore, SyncEngine};
use allowsync_ip_http::HttpIpResolver;
use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(any(feature = "atlas", feature = "aws"))]
use allowsync_core::{CommandRunner, TokioCommandRunner};
#[cfg(any(feature = "atlas", feature = "aws"))]
use std::sync::Arc;

/// Exit codes for the batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllowsyncExitCode {
    /// No account failed
    Success = 0,
    /// Any failure: configuration, registry, IP resolution or an account
    Failure = 1,
}

impl From<AllowsyncExitCode> for ExitCode {
    fn from(code: AllowsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    sync: SyncConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut sync = SyncConfig::default();

        if let Ok(path) = env::var("ALLOWSYNC_REGISTRY_PATH") {
            sync.registry_path = path;
        }

        if let Ok(urls) = env::var("ALLOWSYNC_IP_SOURCES") {
            sync.resolver = ResolverConfig {
                urls: urls
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                ..sync.resolver
            };
        }

        if let Ok(timeout) = env::var("ALLOWSYNC_HTTP_TIMEOUT_SECS") {
            sync.resolver.timeout_secs = timeout.trim().parse().with_context(|| {
                format!("ALLOWSYNC_HTTP_TIMEOUT_SECS must be a number of seconds. Got: {}", timeout)
            })?;
        }

        sync.tools = ToolsConfig {
            atlas_bin: env::var("ALLOWSYNC_ATLAS_BIN").unwrap_or(sync.tools.atlas_bin),
            aws_bin: env::var("ALLOWSYNC_AWS_BIN").unwrap_or(sync.tools.aws_bin),
        };

        let dry_run = match env::var("ALLOWSYNC_MODE") {
            Err(_) => false,
            Ok(mode) => match mode.trim().to_lowercase().as_str() {
                "live" => false,
                "dry-run" | "dry_run" | "dryrun" => true,
                _ => anyhow::bail!(
                    "ALLOWSYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                    mode
                ),
            },
        };

        let probe_profiles = match env::var("ALLOWSYNC_PROBE_PROFILES") {
            Err(_) => false,
            Ok(value) => parse_bool(&value).with_context(|| {
                format!("ALLOWSYNC_PROBE_PROFILES must be true or false. Got: {}", value)
            })?,
        };

        sync.batch = BatchConfig {
            dry_run,
            probe_profiles,
            ..sync.batch
        };

        Ok(Self {
            sync,
            log_level: env::var("ALLOWSYNC_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.sync.validate()?;

        for url in &self.sync.resolver.urls {
            if url.starts_with("http://") {
                eprintln!(
                    "WARNING: IP lookup URL {} uses HTTP (not HTTPS). \
                    A tampered response could put the wrong address on your allow-lists.",
                    url
                );
            }
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "ALLOWSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return AllowsyncExitCode::Failure.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return AllowsyncExitCode::Failure.into();
    }

    let log_level = config.level().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AllowsyncExitCode::Failure.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AllowsyncExitCode::Failure.into();
        }
    };

    let result = rt.block_on(async {
        match run(config.sync).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("❌ {:#}", e);
                AllowsyncExitCode::Failure
            }
        }
    });

    result.into()
}

/// Run one batch
async fn run(config: SyncConfig) -> Result<AllowsyncExitCode> {
    let store = FileRegistryStore::new(&config.registry_path).await?;
    let registry = store
        .load()
        .await
        .with_context(|| format!("Could not load registry {}", config.registry_path))?;
    registry.validate()?;

    if registry.is_empty() {
        println!(
            "No accounts registered in {}. Add document_db or firewall accounts and run again.",
            store.path().display()
        );
        return Ok(AllowsyncExitCode::Failure);
    }

    info!(
        "Loaded {} account(s) labeled '{}'",
        registry.accounts.len(),
        registry.label
    );

    let backends = BackendRegistry::new();

    #[cfg(any(feature = "atlas", feature = "aws"))]
    let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());

    #[cfg(feature = "atlas")]
    allowsync_backend_atlas::register(&backends, config.tools.atlas_bin.clone(), runner.clone());

    #[cfg(feature = "aws")]
    allowsync_backend_aws::register(&backends, config.tools.aws_bin.clone(), runner.clone());

    for kind in BackendKind::ALL {
        let count = registry.accounts_of(kind).count();
        if count > 0 && !backends.has_backend(kind) {
            warn!(
                "{} {} account(s) registered but this build has no {} backend",
                count, kind, kind
            );
        }
    }

    let resolver = HttpIpResolver::from_config(&config.resolver);
    let (engine, events) = SyncEngine::new(backends, &config.batch)?;

    let progress = tokio::spawn(report::log_progress(events));

    let result = engine.resolve_and_run(&resolver, &registry).await;

    // Closing the event channel lets the log task drain and finish
    drop(engine);
    if let Err(e) = progress.await {
        error!("Progress logging failed: {}", e);
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            println!("❌ Could not determine public IP: {}", e);
            return Ok(AllowsyncExitCode::Failure);
        }
    };

    for line in report::render(&summary) {
        println!("{}", line);
    }
    println!();
    println!("{}", report::summary_line(&summary));
    info!("Run took {} ms", summary.duration().num_milliseconds());

    Ok(if summary.is_success() {
        AllowsyncExitCode::Success
    } else {
        AllowsyncExitCode::Failure
    })
}
