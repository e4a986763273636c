//! Delegation data download and record parsing.
//!
//! The APNIC delegation file lists allocated ranges as
//! `apnic|cn|ipv4|<start>|<count>|<date>|<status>` records. Parsing is pure;
//! the blocking fetch is the only I/O in the pipeline.

use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{info, warn};
use regex::Regex;

use crate::addr;
use crate::range::NetworkRange;

const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Download the delegation file. This may take a while; the transform
/// stages themselves never perform I/O.
pub fn fetch_delegations(url: &str) -> Result<String> {
    info!("Fetching delegation data from {}", url);
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pacforge/", env!("CARGO_PKG_VERSION")))
        .timeout(FETCH_TIMEOUT)
        .build()
        .wrap_err("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .wrap_err_with(|| format!("Request to {} failed", url))?;
    if !response.status().is_success() {
        return Err(eyre!(
            "Delegation source returned HTTP {}",
            response.status()
        ));
    }
    response
        .text()
        .wrap_err("Failed to read delegation response body")
}

/// Parse delegation records into network ranges.
///
/// Each matching record carries a starting address and an address count;
/// the count must be a power of two for the allocation to form a single
/// CIDR block. Malformed records are skipped with a warning rather than
/// aborting the run.
pub fn parse_delegations(data: &str) -> Vec<NetworkRange> {
    let record = Regex::new(r"(?i)^apnic\|cn\|ipv4\|([0-9.]+)\|([0-9]+)\|[0-9]*\|a")
        .expect("Invalid delegation record regex");

    let mut ranges = Vec::new();
    for line in data.lines() {
        let Some(caps) = record.captures(line.trim()) else {
            continue;
        };

        let base = match addr::parse_addr(&caps[1]) {
            Ok(base) => base,
            Err(e) => {
                warn!("Skipping malformed delegation record '{}': {}", line, e);
                continue;
            }
        };

        let count: u64 = match caps[2].parse() {
            Ok(count) => count,
            Err(e) => {
                warn!("Skipping malformed delegation record '{}': {}", line, e);
                continue;
            }
        };
        if count == 0 || count > 1 << 32 || !count.is_power_of_two() {
            warn!("Skipping delegation record with non-CIDR count {}: '{}'", count, line);
            continue;
        }

        let prefix = (32 - count.trailing_zeros()) as u8;
        ranges.push(NetworkRange::aligned(base, prefix));
    }

    info!("Parsed {} delegation records", ranges.len());
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
2|apnic|20240101|1234|19850701|20240101|+1000
apnic|*|asn|*|12345|summary
apnic|CN|ipv4|1.0.1.0|256|20110414|allocated
apnic|cn|ipv4|27.8.0.0|262144|20100806|allocated
apnic|jp|ipv4|1.0.16.0|4096|20110412|allocated
apnic|cn|ipv6|2001:250::|35|20000426|allocated
apnic|cn|ipv4|103.1.8.0|1024|20110331|assigned
";

    #[test]
    fn test_parse_delegations_filters_cn_ipv4() {
        let ranges = parse_delegations(SAMPLE);
        assert_eq!(
            ranges,
            vec![
                "1.0.1.0/24".parse().unwrap(),
                "27.8.0.0/14".parse().unwrap(),
                "103.1.8.0/22".parse().unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_delegations_skips_bad_count() {
        let data = "apnic|cn|ipv4|1.0.1.0|300|20110414|allocated\n";
        assert!(parse_delegations(data).is_empty());

        let data = "apnic|cn|ipv4|1.0.1.0|0|20110414|allocated\n";
        assert!(parse_delegations(data).is_empty());
    }

    #[test]
    fn test_parse_delegations_skips_bad_address() {
        let data = "apnic|cn|ipv4|1.0.1.999|256|20110414|allocated\n";
        assert!(parse_delegations(data).is_empty());
    }

    #[test]
    fn test_parse_delegations_empty_input() {
        assert!(parse_delegations("").is_empty());
    }

    #[test]
    fn test_parse_delegations_count_to_prefix() {
        let data = "apnic|cn|ipv4|0.0.0.0|4294967296|20110414|allocated\n";
        let ranges = parse_delegations(data);
        assert_eq!(ranges, vec!["0.0.0.0/0".parse().unwrap()]);
    }
}
