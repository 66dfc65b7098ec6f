//! Probe outcomes
//!
//! A probe run ends in exactly one `ProbeResult`. Results are built once and
//! never changed afterwards; callers read them through accessors or by
//! matching on the variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Message of a read-back that found nothing after a successful write
pub const MSG_READ_BACK_EMPTY: &str = "write succeeded but read found no data";

/// Message of a read-back that found a different record
pub const MSG_READ_BACK_MISMATCH: &str = "read-back data does not match written data";

/// Which part of the probe failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection could not be initialized before any I/O
    Configuration,
    /// The permission-check read was rejected by the access rules
    Permission,
    /// The write step failed
    Write,
    /// The write reported success but the read-back disagreed
    ReadBackInconsistency,
    /// Anything else, passed through with its raw code
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Configuration => "configuration error",
            FailureKind::Permission => "permission error",
            FailureKind::Write => "write error",
            FailureKind::ReadBackInconsistency => "read-back inconsistency",
            FailureKind::Unknown => "unknown error",
        };
        f.write_str(name)
    }
}

/// Outcome of one probe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResult {
    /// The record read back equals the record written
    Success {
        message: String,
        #[serde(rename = "echoedData")]
        echoed_data: Value,
    },
    /// Some step failed
    Failure {
        kind: FailureKind,
        message: String,
        #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none", default)]
        error_code: Option<String>,
        #[serde(rename = "errorDetail", skip_serializing_if = "Option::is_none", default)]
        error_detail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        recommendation: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        notice: Option<String>,
    },
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ProbeResult::Success { message, .. } | ProbeResult::Failure { message, .. } => message,
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ProbeResult::Success { .. } => None,
            ProbeResult::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn echoed_data(&self) -> Option<&Value> {
        match self {
            ProbeResult::Success { echoed_data, .. } => Some(echoed_data),
            ProbeResult::Failure { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ProbeResult::Failure { error_code, .. } => error_code.as_deref(),
            ProbeResult::Success { .. } => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            ProbeResult::Failure { error_detail, .. } => error_detail.as_deref(),
            ProbeResult::Success { .. } => None,
        }
    }

    pub fn recommendation(&self) -> Option<&str> {
        match self {
            ProbeResult::Failure { recommendation, .. } => recommendation.as_deref(),
            ProbeResult::Success { .. } => None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            ProbeResult::Failure { notice, .. } => notice.as_deref(),
            ProbeResult::Success { .. } => None,
        }
    }
}

/// Probe steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStep {
    Initialize,
    PermissionCheck,
    Write,
    ReadBack,
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeStep::Initialize => "initialize",
            ProbeStep::PermissionCheck => "permission check",
            ProbeStep::Write => "write",
            ProbeStep::ReadBack => "read-back",
        };
        f.write_str(name)
    }
}

/// Timing of one attempted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: ProbeStep,
    pub elapsed_ms: u64,
    pub succeeded: bool,
}

/// A result plus when and how the run went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub probe_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Only the steps that were attempted, in order
    pub steps: Vec<StepRecord>,
    pub result: ProbeResult,
}

impl ProbeReport {
    pub fn attempted(&self) -> Vec<ProbeStep> {
        self.steps.iter().map(|s| s.step).collect()
    }
}
