//! Proxy failover ordering.
//!
//! Each policy returns a pure rotation of the proxy list: every proxy
//! appears exactly once, and the client tries them in the returned order.
//! The same rotations are embedded as JavaScript in the generated artifact;
//! the hash here must stay bit-compatible with the embedded one so sticky
//! routing agrees between old and new artifacts.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Proxy balancing policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum BalanceMode {
    /// Straight failover in input order
    #[default]
    No,
    /// Rotate by the client's local address segment
    LocalIp,
    /// Rotate by a hash of the target hostname
    Host,
}

/// Rotation of `proxies` starting at index `k`.
fn rotate(proxies: &[String], k: usize) -> Vec<String> {
    let n = proxies.len();
    (0..n).map(|i| proxies[(k + i) % n].clone()).collect()
}

/// Failover order keyed on a client-local identifier, typically the last
/// octet of the local address. The same client always prefers the same
/// primary proxy while listing the rest as ordered fallbacks.
pub fn by_local_identifier(proxies: &[String], local_key: u32) -> Vec<String> {
    if proxies.is_empty() {
        return Vec::new();
    }
    rotate(proxies, local_key as usize % proxies.len())
}

/// 16-bit rolling hash over the hostname.
///
/// Computed per UTF-16 code unit as `hash = ((hash << 5) - hash + code)`,
/// masked to 16 bits after each step. This is a fixed wire-compatible hash,
/// not a general-purpose one; reimplementations must match it exactly.
pub fn hostname_hash(host: &str) -> u32 {
    let mut hash: u32 = 0;
    for code in host.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(u32::from(code))
            & 0xFFFF;
    }
    hash
}

/// Failover order keyed on the target hostname: the same host is always
/// routed to the same primary proxy (cache affinity).
pub fn by_hostname(proxies: &[String], host: &str) -> Vec<String> {
    if proxies.is_empty() {
        return Vec::new();
    }
    rotate(proxies, hostname_hash(host) as usize % proxies.len())
}

/// Straight failover in input order.
pub fn no_balance(proxies: &[String]) -> Vec<String> {
    proxies.to_vec()
}
