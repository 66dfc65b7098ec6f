//! Store errors
//!
//! Every failure a remote store can report, each with a stable string code
//! that callers can match on without parsing messages.

/// Code reported when a live connection already uses the same app name
pub const CODE_DUPLICATE_APP: &str = "app/duplicate-app";
/// Code reported when the endpoint URL cannot be used
pub const CODE_INVALID_URL: &str = "database/invalid-url";
/// Code reported when the API key is malformed before any I/O
pub const CODE_INVALID_API_KEY: &str = "auth/invalid-api-key";
/// Code reported when the server rejects the API key
pub const CODE_API_KEY_NOT_VALID: &str = "auth/api-key-not-valid";
/// Code reported when the access rules reject an operation
pub const CODE_PERMISSION_DENIED: &str = "PERMISSION_DENIED";
/// Code reported when the database namespace does not exist
pub const CODE_NOT_FOUND: &str = "database/not-found";
/// Code reported for a key path that breaks the key rules
pub const CODE_INVALID_PATH: &str = "database/invalid-path";
/// Code reported for a response body that is not valid JSON
pub const CODE_INVALID_RESPONSE: &str = "database/invalid-response";
/// Transport codes
pub const CODE_TIMEOUT: &str = "network/timeout";
pub const CODE_UNREACHABLE: &str = "network/unreachable";
pub const CODE_REQUEST_FAILED: &str = "network/request-failed";

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connection could not be initialized from the given settings
    #[error("Configuration error ({code}): {message}")]
    Configuration { code: String, message: String },

    /// Credentials were rejected by the server
    #[error("Authentication failed ({code}): {message}")]
    Authentication { code: String, message: String },

    /// Access rules rejected the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A live connection with this app name already exists
    #[error("App '{0}' is already initialized")]
    DuplicateApp(String),

    /// Key path breaks the key rules
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Network error (connection refused, timeout, etc.)
    #[error("Network error ({code}): {message}")]
    Network { code: String, message: String },

    /// HTTP error (non-2xx status without a more specific mapping)
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Database namespace does not exist
    #[error("Database not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Injected or otherwise unclassified failure carrying its own code
    #[error("{code}: {message}")]
    Other { code: String, message: String },
}

impl StoreError {
    /// Stable error code for this failure
    pub fn code(&self) -> String {
        match self {
            StoreError::Configuration { code, .. }
            | StoreError::Authentication { code, .. }
            | StoreError::Network { code, .. }
            | StoreError::Other { code, .. } => code.clone(),
            StoreError::PermissionDenied(_) => CODE_PERMISSION_DENIED.to_string(),
            StoreError::DuplicateApp(_) => CODE_DUPLICATE_APP.to_string(),
            StoreError::InvalidPath { .. } => CODE_INVALID_PATH.to_string(),
            StoreError::Http { status, .. } => format!("database/http-{status}"),
            StoreError::NotFound(_) => CODE_NOT_FOUND.to_string(),
            StoreError::InvalidResponse(_) => CODE_INVALID_RESPONSE.to_string(),
        }
    }

    /// True when the request never got an answer from the store.
    ///
    /// Transport failures say nothing about access rules, so callers should
    /// not read them as a rejection.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Network { .. })
    }

    /// True when the store answered and refused the request: access rules or
    /// credentials said no. Outages, unknown namespaces and undecodable
    /// answers are not rejections.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::PermissionDenied(_) | StoreError::Authentication { .. }
        )
    }

    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        StoreError::Configuration {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn network(code: &str, message: impl Into<String>) -> Self {
        StoreError::Network {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn other(code: &str, message: impl Into<String>) -> Self {
        StoreError::Other {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// The request URL carries the API key and auth token in its query string,
/// so it is stripped before the error is formatted.
impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            StoreError::network(CODE_TIMEOUT, err.to_string())
        } else if err.is_connect() {
            StoreError::network(CODE_UNREACHABLE, err.to_string())
        } else if err.is_decode() {
            StoreError::InvalidResponse(err.to_string())
        } else {
            StoreError::network(CODE_REQUEST_FAILED, err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::InvalidResponse(err.to_string())
    }
}
