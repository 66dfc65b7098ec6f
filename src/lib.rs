//! StoreProbe: remote datastore connectivity checks
//!
//! Command-line front end for the connectivity probe. The probe itself lives
//! in `storeprobe-core`; store backends live in `storeprobe-databases`.

pub mod cli;
pub mod logging;

// Re-export the probe surface for convenience
pub use storeprobe_core::{
    ConnectivityProbe, FailureKind, ProbeConfig, ProbeReport, ProbeResult, ProbeStep,
};
pub use storeprobe_databases::{FirebaseConnector, MemoryConnector, MemoryStore, StoreError};
