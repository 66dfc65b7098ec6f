//! Connectivity probe
//!
//! Runs the diagnostic against a remote store in a fixed order:
//!
//! 1. initialize a fresh connection through the injected connector
//! 2. permission check: read the permission path
//! 3. write a marker record to the diagnostic path
//! 4. read the diagnostic path back and compare
//!
//! A failed step ends the run. Every failure is turned into a
//! `ProbeResult::Failure`; the probe never returns an error or panics on
//! store failures.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use storeprobe_databases::{Connector, StoreError, StorePath};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ProbeConfig;
use crate::hints;
use crate::result::{
    FailureKind, ProbeReport, ProbeResult, ProbeStep, StepRecord, MSG_READ_BACK_EMPTY,
    MSG_READ_BACK_MISMATCH,
};

/// Marker message stored in every test record
pub const PROBE_MARKER: &str = "storeprobe connectivity check";

/// Timestamp source for test records
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs connectivity probes through a connector
pub struct ConnectivityProbe<C> {
    connector: C,
    clock: Clock,
}

impl<C: Connector> ConnectivityProbe<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the timestamp source
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run one probe and return its outcome
    pub async fn run(&self, config: &ProbeConfig) -> ProbeResult {
        self.run_report(config).await.result
    }

    /// Run one probe and return its outcome with step timings
    pub async fn run_report(&self, config: &ProbeConfig) -> ProbeReport {
        let probe_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut steps = StepLog::default();

        let span = info_span!("probe", %probe_id, app = %config.app_name);
        let result = self.execute(config, &mut steps).instrument(span).await;

        match &result {
            ProbeResult::Success { .. } => info!("Probe {probe_id} succeeded"),
            ProbeResult::Failure { kind, .. } => warn!("Probe {probe_id} failed: {kind}"),
        }

        ProbeReport {
            probe_id,
            started_at,
            elapsed_ms: elapsed_ms(start),
            steps: steps.records,
            result,
        }
    }

    /// Test record for this run
    pub fn test_record(&self) -> Value {
        json!({
            "message": PROBE_MARKER,
            "timestamp": (self.clock)().timestamp_millis(),
        })
    }

    async fn execute(&self, config: &ProbeConfig, steps: &mut StepLog) -> ProbeResult {
        let permission_path = match StorePath::parse(&config.permission_path) {
            Ok(path) => path,
            Err(e) => return failure(FailureKind::Configuration, "Invalid permission path", &e),
        };
        let diagnostic_path = match parse_diagnostic_path(&config.diagnostic_path) {
            Ok(path) => path,
            Err(e) => return failure(FailureKind::Configuration, "Invalid diagnostic path", &e),
        };

        let settings = config.connection_settings();
        let store = match steps
            .time(ProbeStep::Initialize, self.connector.connect(&settings))
            .await
        {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to initialize connection: {e}");
                return failure(
                    FailureKind::Configuration,
                    "Failed to initialize connection",
                    &e,
                );
            }
        };

        match steps
            .time(ProbeStep::PermissionCheck, store.exists(&permission_path))
            .await
        {
            Ok(_) => debug!("Permission check passed for /{permission_path}"),
            Err(e) if e.is_rejection() => {
                error!("Permission check rejected: {e}");
                return permission_failure(&e);
            }
            Err(e) if e.is_transport() => {
                error!("Permission check could not reach the database: {e}");
                return failure(
                    FailureKind::Unknown,
                    "Permission check could not reach the database",
                    &e,
                );
            }
            Err(e) => {
                error!("Permission check got an unusable answer: {e}");
                return failure(FailureKind::Unknown, "Permission check failed", &e);
            }
        }

        let record = self.test_record();
        if let Err(e) = steps
            .time(ProbeStep::Write, store.set(&diagnostic_path, record.clone()))
            .await
        {
            error!("Write to /{diagnostic_path} failed: {e}");
            return failure(FailureKind::Write, "Write to diagnostic path failed", &e);
        }

        match steps
            .time(ProbeStep::ReadBack, store.get(&diagnostic_path))
            .await
        {
            Ok(None) => {
                warn!("Read-back of /{diagnostic_path} found no data");
                ProbeResult::Failure {
                    kind: FailureKind::ReadBackInconsistency,
                    message: MSG_READ_BACK_EMPTY.to_string(),
                    error_code: None,
                    error_detail: None,
                    recommendation: None,
                    notice: None,
                }
            }
            Ok(Some(echoed)) if echoed == record => ProbeResult::Success {
                message: format!("Round trip verified at /{diagnostic_path}"),
                echoed_data: echoed,
            },
            Ok(Some(other)) => {
                warn!("Read-back of /{diagnostic_path} returned a different record");
                ProbeResult::Failure {
                    kind: FailureKind::ReadBackInconsistency,
                    message: MSG_READ_BACK_MISMATCH.to_string(),
                    error_code: None,
                    error_detail: Some(other.to_string()),
                    recommendation: None,
                    notice: None,
                }
            }
            Err(e) => {
                error!("Read-back of /{diagnostic_path} failed: {e}");
                failure(FailureKind::Unknown, "Read-back failed", &e)
            }
        }
    }
}

/// Records each attempted step
#[derive(Default)]
struct StepLog {
    records: Vec<StepRecord>,
}

impl StepLog {
    async fn time<T, F>(&mut self, step: ProbeStep, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        debug!("Starting {step}");
        let start = Instant::now();
        let outcome = operation.await;
        self.records.push(StepRecord {
            step,
            elapsed_ms: elapsed_ms(start),
            succeeded: outcome.is_ok(),
        });
        outcome
    }
}

/// The diagnostic record is overwritten on every run, so it must never be the root.
fn parse_diagnostic_path(raw: &str) -> Result<StorePath, StoreError> {
    let path = StorePath::parse(raw)?;
    if path.is_root() {
        return Err(StoreError::InvalidPath {
            path: raw.to_string(),
            reason: "diagnostic path must not be the root".to_string(),
        });
    }
    Ok(path)
}

fn failure(kind: FailureKind, context: &str, err: &StoreError) -> ProbeResult {
    let code = err.code();
    let (recommendation, notice) = hints::split(&code);
    ProbeResult::Failure {
        kind,
        message: format!("{context}: {err}"),
        error_code: Some(code),
        error_detail: Some(err.to_string()),
        recommendation,
        notice,
    }
}

/// Rejected permission check; always carries a recommendation
fn permission_failure(err: &StoreError) -> ProbeResult {
    let code = err.code();
    let recommendation = match hints::lookup(&code) {
        Some(hints::Hint {
            kind: hints::HintKind::Action,
            text,
        }) => text,
        _ => hints::PERMISSION_HINT,
    };
    ProbeResult::Failure {
        kind: FailureKind::Permission,
        message: format!("Permission check failed: {err}"),
        error_code: Some(code),
        error_detail: Some(err.to_string()),
        recommendation: Some(recommendation.to_string()),
        notice: None,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
