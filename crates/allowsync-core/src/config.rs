//! Configuration types for allowsync
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};

/// Default public IP lookup services, tried in order
pub const DEFAULT_IP_SOURCES: &[&str] = &[
    "https://api.ipify.org",
    "https://icanhazip.com",
    "https://ifconfig.me/ip",
];

/// Main allowsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path to the account registry document
    #[serde(default = "default_registry_path")]
    pub registry_path: String,

    /// Public IP resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Backend CLI locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Batch run settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            registry_path: default_registry_path(),
            resolver: ResolverConfig::default(),
            tools: ToolsConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.registry_path.trim().is_empty() {
            return Err(crate::Error::config("Registry path cannot be empty"));
        }

        self.resolver.validate()?;
        self.tools.validate()?;
        self.batch.validate()?;

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Public IP resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Lookup URLs, tried in order until one returns an IPv4 literal
    #[serde(default = "default_ip_sources")]
    pub urls: Vec<String>,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.urls.is_empty() {
            return Err(crate::Error::config("At least one IP lookup URL is required"));
        }

        for url in &self.urls {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "IP lookup URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        if !(1..=120).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "IP lookup timeout must be between 1 and 120 seconds. Got: {}",
                self.timeout_secs
            )));
        }

        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            urls: default_ip_sources(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Backend CLI locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// MongoDB Atlas CLI program
    #[serde(default = "default_atlas_bin")]
    pub atlas_bin: String,

    /// AWS CLI program
    #[serde(default = "default_aws_bin")]
    pub aws_bin: String,
}

impl ToolsConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.atlas_bin.trim().is_empty() {
            return Err(crate::Error::config("Atlas CLI program cannot be empty"));
        }
        if self.aws_bin.trim().is_empty() {
            return Err(crate::Error::config("AWS CLI program cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            atlas_bin: default_atlas_bin(),
            aws_bin: default_aws_bin(),
        }
    }
}

/// Batch run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Plan and report without creating or deleting anything
    #[serde(default)]
    pub dry_run: bool,

    /// Check each account's auth profile before touching its allow-list
    #[serde(default)]
    pub probe_profiles: bool,

    /// Capacity of the progress event channel
    ///
    /// When full, events are dropped (with a warning log). Reconciliation
    /// itself is never blocked by a slow consumer.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            probe_profiles: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_registry_path() -> String {
    "allowsync.json".to_string()
}

fn default_ip_sources() -> Vec<String> {
    DEFAULT_IP_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_atlas_bin() -> String {
    "atlas".to_string()
}

fn default_aws_bin() -> String {
    "aws".to_string()
}

fn default_event_channel_capacity() -> usize {
    256
}
