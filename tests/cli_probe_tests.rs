//! CLI probe tests
//!
//! Runs the full command path (config loading, overrides, probe runs,
//! rendering) against a local REST server and the in-memory backend.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::any;
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, Once};
use tempfile::NamedTempFile;

use storeprobe::cli::{run_with_output, Args, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};

const API_KEY: &str = "cli-test-key";

#[derive(Clone)]
struct FakeDatabase {
    locked: bool,
    data: Arc<Mutex<HashMap<String, Value>>>,
}

async fn handle(
    State(db): State<FakeDatabase>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    if query.get("key").map(String::as_str) != Some(API_KEY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}})),
        );
    }
    if db.locked {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Permission denied"})),
        );
    }

    let key = path.trim_end_matches(".json").to_string();
    let mut data = db.data.lock().unwrap();
    if method == Method::PUT {
        let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        data.insert(key, value.clone());
        (StatusCode::OK, Json(value))
    } else {
        (
            StatusCode::OK,
            Json(data.get(&key).cloned().unwrap_or(Value::Null)),
        )
    }
}

async fn spawn_database(locked: bool) -> String {
    let db = FakeDatabase {
        locked,
        data: Arc::new(Mutex::new(HashMap::new())),
    };
    let app = Router::new().route("/*path", any(handle)).with_state(db);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Drop any `STOREPROBE_*` variables inherited from the host
fn clear_probe_env() {
    static CLEARED: Once = Once::new();
    CLEARED.call_once(|| {
        for (name, _) in std::env::vars() {
            if name.starts_with("STOREPROBE_") {
                std::env::remove_var(name);
            }
        }
    });
}

/// Config file with `body`, so the user's default config is never read
fn config_file(body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{body}").unwrap();
    file
}

/// Parse `extra` with `--config` pointing at `file`
fn args_with(file: &NamedTempFile, extra: &[&str]) -> Args {
    clear_probe_env();
    let path = file.path().to_str().unwrap();
    Args::try_parse_from(
        ["storeprobe", "--config", path]
            .into_iter()
            .chain(extra.iter().copied()),
    )
    .unwrap()
}

/// Parse `extra` against an empty config file
fn cli_args(extra: &[&str]) -> (Args, NamedTempFile) {
    let file = config_file("");
    (args_with(&file, extra), file)
}

fn json_lines(out: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(out)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_successful_probe_against_rest_server() {
    let url = spawn_database(false).await;
    let mut out = Vec::new();

    let (args, _config) = cli_args(&["--url", &url, "--api-key", API_KEY, "--json"]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_SUCCESS);
    let reports = json_lines(&out);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["result"]["outcome"], "success");
    assert_eq!(reports[0]["steps"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_locked_database_reports_permission_failure() {
    let url = spawn_database(true).await;
    let mut out = Vec::new();

    let (args, _config) = cli_args(&["--url", &url, "--api-key", API_KEY, "--json"]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_FAILURE);
    let reports = json_lines(&out);
    let result = &reports[0]["result"];
    assert_eq!(result["outcome"], "failure");
    assert_eq!(result["kind"], "permission");
    assert_eq!(result["errorCode"], "PERMISSION_DENIED");
    assert!(!result["recommendation"].as_str().unwrap().is_empty());
    // initialize + permission check only
    assert_eq!(reports[0]["steps"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rejected_api_key_recommends_checking_it() {
    let url = spawn_database(false).await;
    let mut out = Vec::new();

    let (args, _config) = cli_args(&["--url", &url, "--api-key", "wrong", "--json"]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_FAILURE);
    let result = &json_lines(&out)[0]["result"];
    assert_eq!(result["errorCode"], "auth/api-key-not-valid");
    assert!(result["recommendation"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn test_repeated_runs_each_report() {
    let url = spawn_database(false).await;
    let mut out = Vec::new();

    let (args, _config) = cli_args(&["--url", &url, "--api-key", API_KEY, "--repeat", "3", "--json"]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_SUCCESS);
    let reports = json_lines(&out);
    assert_eq!(reports.len(), 3);
    let ids: Vec<&str> = reports
        .iter()
        .map(|r| r["probe_id"].as_str().unwrap())
        .collect();
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
}

#[tokio::test]
async fn test_memory_backend_text_output() {
    let mut out = Vec::new();

    let (args, _config) = cli_args(&[
        "--backend",
        "memory",
        "--url",
        "https://dry-run.example",
        "--api-key",
        "unused",
    ]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_SUCCESS);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("[1/1] probe "));
    assert!(text.contains(" OK ("));
    assert!(text.contains("Round trip verified at /diagnostics/connectivity"));
}

#[tokio::test]
async fn test_config_file_supplies_connection() {
    let url = spawn_database(false).await;
    let file = config_file(&format!(
        "database_url = \"{url}\"\napi_key = \"{API_KEY}\"\ndiagnostic_path = \"ci/probe\"\n"
    ));
    let mut out = Vec::new();

    let code = run_with_output(args_with(&file, &["--json"]), &mut out).await;

    assert_eq!(code, EXIT_SUCCESS);
    let reports = json_lines(&out);
    assert!(reports[0]["result"]["message"]
        .as_str()
        .unwrap()
        .contains("/ci/probe"));
}

#[tokio::test]
async fn test_missing_config_file_exits_with_config_error() {
    let mut out = Vec::new();

    clear_probe_env();
    let args = Args::try_parse_from(["storeprobe", "--config", "/definitely/not/here/probe.toml"])
        .unwrap();
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_CONFIG_ERROR);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_missing_url_is_a_configuration_failure() {
    let mut out = Vec::new();

    let (args, _config) = cli_args(&["--url", "", "--api-key", API_KEY, "--json"]);
    let code = run_with_output(args, &mut out).await;

    assert_eq!(code, EXIT_FAILURE);
    let result = &json_lines(&out)[0]["result"];
    assert_eq!(result["kind"], "configuration");
    assert_eq!(result["errorCode"], "database/invalid-url");
}

#[tokio::test]
async fn test_zero_timeout_in_config_exits_with_config_error() {
    let file = config_file("request_timeout_secs = 0\n");
    let mut out = Vec::new();

    let code = run_with_output(args_with(&file, &["--backend", "memory"]), &mut out).await;

    assert_eq!(code, EXIT_CONFIG_ERROR);
    assert!(out.is_empty());
}
