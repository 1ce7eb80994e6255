// # HTTP IP Resolver
//
// This crate provides the HTTP-based public IP resolver for allowsync.
//
// ## Behavior
//
// Lookup URLs are tried in order. Each one must answer with a 2xx status and
// a body that is exactly one IPv4 literal (surrounding whitespace allowed).
// Anything else (connection error, timeout, non-2xx status, IPv6, HTML error
// page) is logged and the next URL is tried. Only when every URL fails does
// resolution fail.
//
// No caching: every call performs fresh lookups.

use allowsync_core::config::ResolverConfig;
use allowsync_core::traits::{IpResolver, parse_ipv4_literal};
use allowsync_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Public IP resolver backed by plain-text lookup services
pub struct HttpIpResolver {
    /// URLs to query, in order
    urls: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `urls`: Lookup URLs, tried in order (e.g., "https://api.ipify.org")
    /// - `timeout`: Per-request timeout
    pub fn new(urls: Vec<String>, timeout: Duration) -> Self {
        Self {
            urls,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create from the resolver section of the configuration
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.urls.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Lookup URLs in the order they are tried
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Fetch and parse the address from one URL
    async fn fetch_ip(&self, url: &str) -> std::result::Result<Ipv4Addr, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;

        parse_ipv4_literal(&body).ok_or_else(|| {
            let preview: String = body.trim().chars().take(64).collect();
            format!("not an IPv4 address: {:?}", preview)
        })
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        for url in &self.urls {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::debug!("Resolved public IP {} via {}", ip, url);
                    return Ok(ip);
                }
                Err(reason) => {
                    tracing::warn!("IP lookup via {} failed: {}", url, reason);
                }
            }
        }

        Err(Error::resolution(format!(
            "all {} lookup source(s) failed",
            self.urls.len()
        )))
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
