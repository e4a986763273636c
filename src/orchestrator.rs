//! Generation pipeline driver.
//!
//! Coordinates fetch, merge, fragmentation, bucketing, and emission, then
//! writes the artifact. The transform stages are pure; all I/O happens
//! here and in the fetcher.

use std::fs;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::Serialize;

use crate::bucket::LookupTable;
use crate::config::GeneratorConfig;
use crate::range::NetworkRange;
use crate::{fetch, fragment, pac, range};

/// Missing inputs that would make the artifact meaningless
#[derive(Debug, thiserror::Error)]
pub enum EmptyInputError {
    #[error("No address ranges parsed from the delegation source")]
    NoRanges,

    #[error("At least one proxy must be configured")]
    NoProxies,
}

/// Statistics from one generation run.
#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    /// Merged rule count
    pub rules: usize,
    /// Total fragments across all levels
    pub fragments: usize,
    /// Number of configured prefix levels (steps to match)
    pub levels: usize,
    /// Buckets holding at least one fragment
    pub occupied_buckets: usize,
    /// Average fragments per occupied bucket
    pub avg_bucket_len: f64,
    /// Estimated lookup cost: average bucket length times steps to match
    pub matching_cost: f64,
}

/// Run the transform on already-parsed ranges and return the artifact text
/// with its statistics. Pure except for logging.
pub fn build_artifact(
    config: &GeneratorConfig,
    ranges: &[NetworkRange],
) -> Result<(String, GenerationSummary)> {
    config.validate()?;
    if config.proxies.is_empty() {
        return Err(EmptyInputError::NoProxies.into());
    }
    if ranges.is_empty() {
        return Err(EmptyInputError::NoRanges.into());
    }

    info!("Merging {} raw ranges", ranges.len());
    let merged = range::merge(ranges);
    info!("Merged into {} ranges", merged.len());

    let levels = fragment::levels(config.min_prefix, config.max_prefix, config.mask_step);
    info!(
        "Fragmenting onto prefix levels [{}, {}] step {}",
        config.min_prefix, config.max_prefix, config.mask_step
    );
    let fragments = fragment::fragment_all(&merged, &levels);
    let table = LookupTable::build(&fragments, config.hash_base);
    info!(
        "Built {} hash levels over {} fragments",
        table.levels.len(),
        table.fragment_count()
    );

    let content = pac::render(
        &table,
        &config.proxies,
        config.balance,
        &config.no_proxy,
        config.mask_step,
    )?;

    let summary = summarize(&merged, &table);
    Ok((content, summary))
}

/// Full generation run: read or fetch the delegation data, transform it,
/// and write the artifact to the configured output path.
pub fn generate(config: &GeneratorConfig) -> Result<GenerationSummary> {
    let data = match &config.source_file {
        Some(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read delegation file '{}'", path.display()))?,
        None => fetch::fetch_delegations(&config.source_url)?,
    };
    let ranges = fetch::parse_delegations(&data);

    let (content, summary) = build_artifact(config, &ranges)?;

    fs::write(&config.output, &content).wrap_err_with(|| {
        format!("Failed to write PAC file '{}'", config.output.display())
    })?;

    info!("Rules: {} items", summary.rules);
    info!("Average matching length: {:.3}", summary.avg_bucket_len);
    info!("Steps to match: {}", summary.levels);
    info!("Matching cost est.: {:.3}", summary.matching_cost);
    Ok(summary)
}

fn summarize(merged: &[NetworkRange], table: &LookupTable) -> GenerationSummary {
    let fragments = table.fragment_count();
    let occupied = table.occupied_buckets();
    let avg_bucket_len = if occupied > 0 {
        fragments as f64 / occupied as f64
    } else {
        0.0
    };
    let levels = table.levels.len();
    GenerationSummary {
        rules: merged.len(),
        fragments,
        levels,
        occupied_buckets: occupied,
        avg_bucket_len,
        matching_cost: avg_bucket_len * levels as f64,
    }
}
