//! CLI dispatch
//!
//! Loads configuration, picks the store backend, runs the requested number of
//! probes one after another and renders each report.

use std::io::{self, Write};
use std::sync::Arc;
use storeprobe_core::{ConnectivityProbe, ProbeConfig, ProbeReport};
use storeprobe_databases::{
    ConnectionRegistry, Connector, FirebaseConnector, MemoryConnector, MemoryStore,
};
use tracing::{debug, error, info};

use crate::cli::render::{render_json, render_text};
use crate::cli::{Args, Backend, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the probe command, printing reports to stdout
pub async fn run(args: Args) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(args, &mut out).await
}

/// Run the probe command, printing reports to `out`
pub async fn run_with_output<W: Write>(args: Args, out: &mut W) -> ExitCode {
    let mut config = match ProbeConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            eprintln!("Error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };
    args.apply_overrides(&mut config);
    debug!("Effective configuration: {:?}", config.redacted());

    let connector = connector_for(args.backend);
    let probe = ConnectivityProbe::new(connector);

    info!(
        "Probing {} ({} run(s), backend {:?})",
        config.database_url, args.repeat, args.backend
    );
    let reports = run_probes(&probe, &config, args.repeat).await;

    let total = reports.len();
    for (i, report) in reports.iter().enumerate() {
        let rendered = if args.json {
            render_json(out, report)
        } else {
            render_text(out, report, i + 1, total)
        };
        if let Err(e) = rendered {
            error!("Failed to write report: {e}");
            return EXIT_FAILURE;
        }
    }

    let failed = reports.iter().filter(|r| !r.result.is_success()).count();
    if failed == 0 {
        info!("All {total} probe run(s) succeeded");
        EXIT_SUCCESS
    } else {
        error!("{failed} of {total} probe run(s) failed");
        EXIT_FAILURE
    }
}

/// Run `repeat` probes sequentially; each opens its own connection
pub async fn run_probes<C: Connector>(
    probe: &ConnectivityProbe<C>,
    config: &ProbeConfig,
    repeat: u32,
) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(repeat as usize);
    for run in 1..=repeat {
        debug!("Starting probe run {run}/{repeat}");
        reports.push(probe.run_report(config).await);
    }
    reports
}

fn connector_for(backend: Backend) -> Arc<dyn Connector> {
    match backend {
        Backend::Firebase => Arc::new(FirebaseConnector::with_registry(ConnectionRegistry::new())),
        Backend::Memory => Arc::new(MemoryConnector::new(Arc::new(MemoryStore::new()))),
    }
}
