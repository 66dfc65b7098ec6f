//! CLI argument parsing
//!
//! Every connection option can also come from the config file or the
//! environment; flags given here win over both.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use storeprobe_core::ProbeConfig;

use crate::logging::LogFormat;

/// Store backend to probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Firebase Realtime Database over REST
    Firebase,
    /// Local in-memory store (dry run, no network)
    Memory,
}

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "storeprobe",
    version,
    about = "Check read/write connectivity to a remote key-value datastore"
)]
pub struct Args {
    /// Config file (TOML); defaults to <config dir>/storeprobe/probe.toml if present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database endpoint URL
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// API key
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Project identifier
    #[arg(long, value_name = "ID")]
    pub project_id: Option<String>,

    /// Database auth token
    #[arg(long, value_name = "TOKEN")]
    pub auth_token: Option<String>,

    /// Diagnostic path written and read back
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Path read by the permission check
    #[arg(long, value_name = "PATH")]
    pub permission_path: Option<String>,

    /// Logical connection name
    #[arg(long, value_name = "NAME")]
    pub app_name: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Store backend
    #[arg(long, value_enum, default_value_t = Backend::Firebase)]
    pub backend: Backend,

    /// Number of sequential probe runs
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Print one JSON report per run instead of text
    #[arg(long)]
    pub json: bool,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Write logs to <DIR>/storeprobe.log instead of stderr
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Overlay flags onto a loaded config
    pub fn apply_overrides(&self, config: &mut ProbeConfig) {
        if let Some(ref url) = self.url {
            config.database_url = url.clone();
        }
        if let Some(ref key) = self.api_key {
            config.api_key = key.clone();
        }
        if let Some(ref project_id) = self.project_id {
            config.project_id = project_id.clone();
        }
        if let Some(ref token) = self.auth_token {
            config.auth_token = Some(token.clone());
        }
        if let Some(ref path) = self.path {
            config.diagnostic_path = path.clone();
        }
        if let Some(ref path) = self.permission_path {
            config.permission_path = path.clone();
        }
        if let Some(ref name) = self.app_name {
            config.app_name = name.clone();
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
    }
}
