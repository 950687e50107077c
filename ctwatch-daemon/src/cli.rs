//! CLI argument definitions for ctwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Certificate Transparency log monitoring daemon.
///
/// Discovers usable CT logs, polls them for new entries and reports
/// certificates whose names match the configured rules as JSON lines
/// on standard output.
#[derive(Parser, Debug)]
#[command(name = "ctwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to ctwatch.toml configuration file.
    ///
    /// A missing file is not an error; built-in defaults are used.
    #[arg(short, long, default_value = "ctwatch.toml")]
    pub config: PathBuf,

    /// Path to the JSON rule file (category -> regular expression).
    #[arg(short, long, default_value = "rules.json")]
    pub rules: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the CT log list URL.
    #[arg(long)]
    pub log_list_url: Option<String>,

    /// Validate configuration and rules, then exit without monitoring.
    #[arg(long)]
    pub validate: bool,

    /// Stop after this many seconds instead of waiting for a signal.
    #[arg(long)]
    pub duration_secs: Option<u64>,
}
