//! CLI module
//!
//! Provides:
//! - Argument parsing and config overrides
//! - Probe dispatch (sequential runs against the chosen backend)
//! - Result rendering (text or JSON lines)

pub mod args;
pub mod dispatch;
pub mod render;

// Re-exports
pub use args::{Args, Backend};
pub use dispatch::{run, run_with_output, ExitCode};
pub use render::{render_json, render_text};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Configuration error: {0}")]
    Config(#[from] storeprobe_core::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgs("--repeat must be positive".to_string());
        assert!(err.to_string().contains("--repeat"));

        let err = Error::Logging("bad filter".to_string());
        assert_eq!(err.to_string(), "Logging setup failed: bad filter");
    }

    #[test]
    fn test_error_from_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
