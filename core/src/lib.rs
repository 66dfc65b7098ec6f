//! StoreProbe Core Module
//!
//! The core module provides the connectivity probe: configuration, the
//! three-step diagnostic run against a remote store, and the structured
//! outcome it produces.

pub mod config;
pub mod hints;
pub mod probe;
pub mod result;

pub use config::{ConfigError, ProbeConfig};
pub use hints::{Hint, HintKind};
pub use probe::{Clock, ConnectivityProbe, PROBE_MARKER};
pub use result::{
    FailureKind, ProbeReport, ProbeResult, ProbeStep, StepRecord, MSG_READ_BACK_EMPTY,
    MSG_READ_BACK_MISMATCH,
};
