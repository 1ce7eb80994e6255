// # IP Resolver Trait
//
// Defines the interface for determining the caller's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP lookup services with fallback: `allowsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use allowsync_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.resolve().await?;
//     println!("Current IP: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolver implementations
///
/// A resolver is asked exactly once per run. It may consult several
/// lookup sources internally, but it must not retry a failed source.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform network I/O to its configured lookup sources
/// - ✅ Fall through to the next source when one fails
///
/// ## Forbidden Capabilities
/// - ❌ Touch any backend allow-list (use `AllowListBackend`)
/// - ❌ Retry a source or sleep between attempts
/// - ❌ Cache an address across runs
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The first address a lookup source returned
    /// - `Err(Error::Resolution)`: Every source failed or returned garbage
    async fn resolve(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}

/// Parse a lookup-service response body as a strict dotted-quad IPv4 literal
///
/// Surrounding whitespace (the trailing newline most services send) is
/// ignored. Anything else, including IPv6 literals, CIDR suffixes and
/// octets with leading zeros, is rejected.
pub fn parse_ipv4_literal(body: &str) -> Option<Ipv4Addr> {
    let text = body.trim();
    let dotted_quad = text.split('.').count() == 4
        && text.split('.').all(|octet| {
            !octet.is_empty() && octet.len() <= 3 && octet.bytes().all(|b| b.is_ascii_digit())
        });

    if !dotted_quad {
        return None;
    }

    text.parse().ok()
}
