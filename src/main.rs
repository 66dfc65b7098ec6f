//! StoreProbe CLI
//!
//! Runs the connectivity probe and exits with:
//! - 0 when every run succeeded
//! - 1 when any run failed
//! - 2 when configuration could not be loaded

use anyhow::Context;
use clap::Parser;

use storeprobe::cli::{self, Args};
use storeprobe::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let guard = init_tracing(&args.log_level, args.log_format, args.log_dir.as_deref())
        .context("failed to initialize logging")?;

    let code = cli::run(args).await;

    // exit() skips destructors; flush the log writer first
    drop(guard);
    std::process::exit(code);
}
