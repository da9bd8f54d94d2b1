//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-limit aware GitHub REST API client
#[derive(Parser, Debug)]
#[command(name = "ghrest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Personal access token
    #[arg(short, long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API root, overrides the configuration file
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make a single GET request
    Get {
        /// Path relative to the API root, or an absolute API URL
        url: String,

        /// Query parameter (repeatable, key=value)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Accept header: raw, html, object or a full media type
        #[arg(long)]
        accept: Option<String>,
    },

    /// Follow every page of a listing
    Paginate {
        /// Path relative to the API root, or an absolute API URL
        url: String,

        /// Query parameter for the first page (repeatable, key=value)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Accept header: raw, html, object or a full media type
        #[arg(long)]
        accept: Option<String>,

        /// Stop after this many elements
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the rate-limit counters
    RateLimit,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one value per line)
    Json,
    /// Human-readable output
    Pretty,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
