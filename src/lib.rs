//! # Pacforge - Proxy auto-config generator with hashed CIDR lookup tables
//!
//! This library turns a list of delegated IPv4 ranges into a self-contained
//! PAC (proxy auto-config) file whose embedded lookup function answers
//! "does this destination belong to the range set?" in expected O(1) time.
//!
//! ## Overview
//!
//! Raw CIDR blocks are merged into a minimal covering set, split into
//! fragments whose prefix lengths land on a small set of configured levels,
//! and distributed into per-level hash tables keyed by a positional hash of
//! the network address. The tables, the lookup function, proxy balancing
//! logic, and bypass rules are then serialized into a single JavaScript
//! `FindProxyForURL` artifact.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `addr`: dotted-quad/integer address codec and subnet mask helpers
//! - `range`: CIDR range type and range merging
//! - `fragment`: splitting merged ranges onto configured prefix levels
//! - `bucket`: per-level hash table construction and membership testing
//! - `balance`: proxy failover rotations (local identifier, hostname, none)
//! - `pac`: PAC artifact emission
//! - `fetch`: delegation data download and record parsing
//! - `config`: generator settings with YAML file support
//! - `orchestrator`: high-level coordination of one generation run
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pacforge::{config::GeneratorConfig, orchestrator};
//!
//! let config = GeneratorConfig::default();
//! let summary = orchestrator::generate(&config)?;
//! println!("{} rules in {} levels", summary.rules, summary.levels);
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Core modules raise typed errors (`FormatError`, `ConfigError`,
//! `EmptyInputError`); the orchestration layer wraps them in
//! `color_eyre::Result` with context. Core code logs through `log` and
//! never prints.

pub mod addr;
pub mod balance;
pub mod bucket;
pub mod config;
pub mod fetch;
pub mod fragment;
pub mod orchestrator;
pub mod pac;
pub mod range;
