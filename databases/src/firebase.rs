//! Firebase Realtime Database REST store
//!
//! Talks to the database over its REST surface: `GET {url}/{path}.json` reads
//! a record (JSON `null` means nothing is stored), `PUT` replaces one.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{
    StoreError, CODE_API_KEY_NOT_VALID, CODE_INVALID_API_KEY, CODE_INVALID_URL,
};
use crate::registry::{ConnectionRegistry, RegistryLease};
use crate::{ConnectionSettings, Connector, RemoteStore, Result, StorePath};

/// REST connection to one database
#[derive(Debug)]
pub struct FirebaseStore {
    client: Client,
    base_url: Url,
    api_key: String,
    auth_token: Option<String>,
    /// Held for the connection's lifetime when opened through a registry
    _lease: Option<RegistryLease>,
}

impl FirebaseStore {
    /// Validate `settings` and build the HTTP client. No request is sent.
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        Self::open_with_lease(settings, None)
    }

    fn open_with_lease(settings: &ConnectionSettings, lease: Option<RegistryLease>) -> Result<Self> {
        let base_url = parse_database_url(&settings.database_url)?;
        validate_api_key(&settings.api_key)?;

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| {
                StoreError::configuration("database/client-init", format!("HTTP client: {e}"))
            })?;

        debug!(
            "Opened REST connection to {base_url} (project '{}')",
            settings.project_id
        );

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
            auth_token: settings.auth_token.clone(),
            _lease: lease,
        })
    }

    /// REST endpoint for `path`
    pub fn endpoint(&self, path: &StorePath, shallow: bool) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/{path}.json"));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            if let Some(ref token) = self.auth_token {
                query.append_pair("auth", token);
            }
            if shallow {
                query.append_pair("shallow", "true");
            }
        }
        url
    }

    async fn fetch(&self, path: &StorePath, shallow: bool) -> Result<Option<Value>> {
        let response = self.client.get(self.endpoint(path, shallow)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            warn!("GET /{path} failed: {err}");
            return Err(err);
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>> {
        self.fetch(path, false).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
        let response = self
            .client
            .put(self.endpoint(path, false))
            .json(&value)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            warn!("PUT /{path} failed: {err}");
            return Err(err);
        }

        debug!("PUT /{path} -> {status}");
        Ok(())
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(self.fetch(path, true).await?.is_some())
    }
}

/// Opens a `FirebaseStore` per call, optionally leasing the app name from a registry
#[derive(Debug, Clone, Default)]
pub struct FirebaseConnector {
    registry: Option<Arc<ConnectionRegistry>>,
}

impl FirebaseConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to open a second live connection under the same app name
    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry: Some(registry),
        }
    }
}

#[async_trait]
impl Connector for FirebaseConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>> {
        parse_database_url(&settings.database_url)?;
        validate_api_key(&settings.api_key)?;

        let lease = match self.registry {
            Some(ref registry) => Some(registry.acquire(&settings.app_name, &settings.database_url)?),
            None => None,
        };

        let store = FirebaseStore::open_with_lease(settings, lease)?;
        info!(
            "Connected app '{}' to {}",
            settings.app_name, settings.database_url
        );
        Ok(Box::new(store))
    }
}

/// Parse and check the database URL
pub fn parse_database_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::configuration(
            CODE_INVALID_URL,
            "database URL is empty",
        ));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| StoreError::configuration(CODE_INVALID_URL, format!("'{trimmed}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(StoreError::configuration(
            CODE_INVALID_URL,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(StoreError::configuration(
            CODE_INVALID_URL,
            format!("'{trimmed}' has no host"),
        ));
    }

    Ok(url)
}

/// Reject API keys that cannot be valid before sending them anywhere
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::configuration(
            CODE_INVALID_API_KEY,
            "API key is empty",
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(StoreError::configuration(
            CODE_INVALID_API_KEY,
            "API key contains whitespace",
        ));
    }
    Ok(())
}

/// Map a non-2xx response to a store error
pub fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let message = error_message(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied(message),
        StatusCode::BAD_REQUEST if message.to_lowercase().contains("api key not valid") => {
            StoreError::Authentication {
                code: CODE_API_KEY_NOT_VALID.to_string(),
                message,
            }
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ => StoreError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

/// The `error` field of a JSON error body, or the raw body
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| match v.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    });

    from_json.unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(url: &str) -> ConnectionSettings {
        ConnectionSettings {
            database_url: url.to_string(),
            api_key: "AIzaTestKey".to_string(),
            project_id: "demo".to_string(),
            auth_token: None,
            app_name: "[DEFAULT]".to_string(),
            request_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_parse_database_url() {
        assert!(parse_database_url("https://demo-default-rtdb.firebaseio.com").is_ok());
        assert!(parse_database_url("http://127.0.0.1:9000/?ns=demo").is_ok());

        for bad in ["", "   ", "not a url", "ftp://demo.example", "file:///tmp/db"] {
            let err = parse_database_url(bad).unwrap_err();
            assert_eq!(err.code(), "database/invalid-url", "{bad}");
        }
    }

    #[test]
    fn test_validate_api_key() {
        assert!(validate_api_key("AIzaSyExample").is_ok());
        assert_eq!(
            validate_api_key("").unwrap_err().code(),
            "auth/invalid-api-key"
        );
        assert_eq!(
            validate_api_key("has space").unwrap_err().code(),
            "auth/invalid-api-key"
        );
    }

    #[test]
    fn test_endpoint_building() {
        let store = FirebaseStore::open(&settings("https://demo.firebaseio.com/")).unwrap();
        let path = StorePath::parse("diagnostics/connectivity").unwrap();

        let url = store.endpoint(&path, false);
        assert_eq!(url.path(), "/diagnostics/connectivity.json");
        assert_eq!(url.query(), Some("key=AIzaTestKey"));

        let root = store.endpoint(&StorePath::root(), true);
        assert_eq!(root.path(), "/.json");
        assert!(root.query().unwrap().contains("shallow=true"));
    }

    #[test]
    fn test_endpoint_keeps_namespace_query_and_token() {
        let mut s = settings("http://127.0.0.1:9000/?ns=demo");
        s.auth_token = Some("secret".to_string());
        let store = FirebaseStore::open(&s).unwrap();

        let url = store.endpoint(&StorePath::parse("a").unwrap(), false);
        let query = url.query().unwrap();
        assert!(query.starts_with("ns=demo"));
        assert!(query.contains("auth=secret"));
    }

    #[test]
    fn test_classify_status() {
        let err = classify_status(StatusCode::UNAUTHORIZED, r#"{"error":"Permission denied"}"#);
        assert_eq!(err, StoreError::PermissionDenied("Permission denied".into()));

        let err = classify_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#,
        );
        assert_eq!(err.code(), "auth/api-key-not-valid");

        let err = classify_status(StatusCode::NOT_FOUND, "namespace missing");
        assert_eq!(err.code(), "database/not-found");

        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.code(), "database/http-503");
    }

    #[tokio::test]
    async fn test_connector_rejects_bad_settings_before_io() {
        let connector = FirebaseConnector::new();

        let err = connector.connect(&settings("::nope")).await.err().unwrap();
        assert_eq!(err.code(), "database/invalid-url");

        let mut s = settings("https://demo.firebaseio.com");
        s.api_key.clear();
        let err = connector.connect(&s).await.err().unwrap();
        assert_eq!(err.code(), "auth/invalid-api-key");
    }

    #[tokio::test]
    async fn test_connector_with_registry_detects_duplicate_app() {
        let registry = ConnectionRegistry::new();
        let connector = FirebaseConnector::with_registry(registry.clone());
        let s = settings("https://demo.firebaseio.com");

        let first = connector.connect(&s).await.unwrap();
        let err = connector.connect(&s).await.err().unwrap();
        assert_eq!(err.code(), "app/duplicate-app");

        drop(first);
        assert!(!registry.is_live("[DEFAULT]"));
        assert!(connector.connect(&s).await.is_ok());
    }
}
