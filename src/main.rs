use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use pacforge::balance::BalanceMode;
use pacforge::config::{self, GeneratorConfig};
use pacforge::orchestrator;

/// Generate a proxy auto-config (PAC) file with a hashed CIDR lookup table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Proxy servers in PAC syntax; multiple values enable balancing,
    /// e.g. -x 'SOCKS 127.0.0.1:8964' 'SOCKS5 127.0.0.1:1984'
    #[arg(short = 'x', long = "proxy", num_args = 1..)]
    proxy: Option<Vec<String>>,

    /// Proxy balancing policy
    #[arg(short, long, value_enum)]
    balance: Option<BalanceMode>,

    /// Networks or hosts that bypass the proxy, CIDR notation supported
    #[arg(short = 'n', long = "no-proxy", num_args = 1..)]
    no_proxy: Option<Vec<String>>,

    /// Size of each level's bucket table; larger values improve lookup
    /// speed but increase file size
    #[arg(short = 's', long)]
    hash_base: Option<u32>,

    /// Step size between configured prefix levels
    #[arg(short = 'm', long)]
    mask_step: Option<u8>,

    /// Coarsest prefix level in the lookup table
    #[arg(long)]
    min_prefix: Option<u8>,

    /// Finest prefix level in the lookup table
    #[arg(long)]
    max_prefix: Option<u8>,

    /// Output PAC filename
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delegation data URL
    #[arg(long)]
    source_url: Option<String>,

    /// Read delegation data from a local file instead of fetching
    #[arg(long)]
    source_file: Option<PathBuf>,

    /// Optional YAML configuration file; flags override file values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn apply_overrides(config: &mut GeneratorConfig, args: Args) {
    if let Some(proxy) = args.proxy {
        config.proxies = proxy;
    }
    if let Some(balance) = args.balance {
        config.balance = balance;
    }
    if let Some(no_proxy) = args.no_proxy {
        config.no_proxy = no_proxy;
    }
    if let Some(hash_base) = args.hash_base {
        config.hash_base = hash_base;
    }
    if let Some(mask_step) = args.mask_step {
        config.mask_step = mask_step;
    }
    if let Some(min_prefix) = args.min_prefix {
        config.min_prefix = min_prefix;
    }
    if let Some(max_prefix) = args.max_prefix {
        config.max_prefix = max_prefix;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(source_url) = args.source_url {
        config.source_url = source_url;
    }
    if let Some(source_file) = args.source_file {
        config.source_file = Some(source_file);
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => GeneratorConfig::default(),
    };
    apply_overrides(&mut config, args);

    info!("Starting PAC generation");
    info!("Output file: {:?}", config.output);

    let summary = orchestrator::generate(&config)?;

    info!(
        "Generated {} rules across {} levels ({} fragments)",
        summary.rules, summary.levels, summary.fragments
    );
    info!("PAC generation completed successfully");
    info!(
        "Usage: configure your browser to use {:?} as the automatic proxy configuration file",
        config.output
    );
    Ok(())
}
