//! End-to-end tests for `GET /proxy` against a local stand-in upstream.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tickerproxy_server::{api::app_router, build_state, config::Config};
use tower::ServiceExt;

// =============================================================================
// Stand-in upstream
// =============================================================================

/// Behaviour is picked by symbol so one stub covers every failure mode.
async fn upstream(
    State(hits): State<Arc<AtomicUsize>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    if params.get("apikey").map(String::as_str) != Some("test-key") {
        return Json(json!({"Error Message": "the parameter apikey is invalid or missing"}))
            .into_response();
    }
    let symbol = params.get("symbol").cloned().unwrap_or_default();
    match symbol.as_str() {
        "THRT" => Json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        }))
        .into_response(),
        "LIMIT" => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "30")],
            "slow down",
        )
            .into_response(),
        "SLOW" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"Symbol": "SLOW"})).into_response()
        }
        lagging if lagging.starts_with("LAG") => {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Json(json!({"Symbol": lagging})).into_response()
        }
        "ERR" => Json(json!({"Error Message": "Invalid API call."})).into_response(),
        "HTML" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        _ => Json(json!({
            "Symbol": symbol,
            "function": params.get("function"),
            "outputsize": params.get("outputsize"),
        }))
        .into_response(),
    }
}

struct TestApp {
    router: Router,
    hits: Arc<AtomicUsize>,
    cache_dir: TempDir,
    fixtures_dir: TempDir,
}

impl TestApp {
    async fn start(api_key: Option<&str>) -> Self {
        Self::start_with(api_key, &[]).await
    }

    async fn start_with(api_key: Option<&str>, overrides: &[(&'static str, &str)]) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let stub = Router::new()
            .route("/query", get(upstream))
            .with_state(hits.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let cache_dir = tempdir().unwrap();
        let fixtures_dir = tempdir().unwrap();
        let mut vars = HashMap::new();
        vars.insert("TP_UPSTREAM_URL", format!("http://{addr}/query"));
        vars.insert("TP_UPSTREAM_TIMEOUT_MS", "300".to_string());
        vars.insert("TP_MIN_SPACING_MS", "0".to_string());
        vars.insert("TP_CACHE_DIR", path_string(cache_dir.path()));
        vars.insert("TP_FIXTURES_DIR", path_string(fixtures_dir.path()));
        if let Some(key) = api_key {
            vars.insert("ALPHA_VANTAGE_API_KEY", key.to_string());
        }
        for (name, value) in overrides {
            vars.insert(*name, value.to_string());
        }
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
        let state = build_state(&config).await.unwrap();

        Self {
            router: app_router(state, &config),
            hits,
            cache_dir,
            fixtures_dir,
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, header::HeaderMap, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn serves_upstream_then_memory() {
    let app = TestApp::start(Some("test-key")).await;

    let (status, headers, body) = app.get("/proxy?operation=OVERVIEW&symbol=IBM").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["source"], "upstream");
    assert_eq!(body["cached"], false);
    assert_eq!(body["stale"], false);
    assert_eq!(body["data"]["Symbol"], "IBM");
    assert_eq!(body["data"]["function"], "OVERVIEW");
    assert!(body.get("warning").is_none());
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, s-maxage=86400, stale-while-revalidate=86400"
    );
    assert!(headers.contains_key("x-request-id"));

    let (status, _, again) = app.get("/proxy?operation=OVERVIEW&symbol=IBM").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["source"], "memory");
    assert_eq!(again["cached"], true);
    assert_eq!(again["data"], body["data"]);
    assert_eq!(app.hits(), 1);

    assert!(app.cache_dir.path().join("OVERVIEW__IBM.json").is_file());
}

#[tokio::test]
async fn daily_series_uses_compact_output() {
    let app = TestApp::start(Some("test-key")).await;

    let (status, headers, body) = app
        .get("/proxy?operation=TIME_SERIES_DAILY&symbol=BRK.B")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outputsize"], "compact");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, s-maxage=21600, stale-while-revalidate=21600"
    );
}

#[tokio::test]
async fn missing_credential_is_500() {
    let app = TestApp::start(None).await;

    let (status, headers, body) = app.get("/proxy?operation=OVERVIEW&symbol=IBM").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("API key"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(app.hits(), 0);
}

#[tokio::test]
async fn rejects_invalid_input_without_io() {
    let app = TestApp::start(Some("test-key")).await;

    for uri in [
        "/proxy?operation=OVERVIEW&symbol=ibm",
        "/proxy?operation=OVERVIEW&symbol=A%2FB",
        "/proxy?operation=OVERVIEW&symbol=ABCDEFGHIJK",
        "/proxy?operation=OVERVIEW",
        "/proxy?operation=GLOBAL_QUOTE&symbol=IBM",
        "/proxy",
        "/proxy?operation=OVERVIEW&operation=OVERVIEW&symbol=IBM",
    ] {
        let (status, _, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["ok"], false, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }

    assert_eq!(app.hits(), 0);
    assert_eq!(std::fs::read_dir(app.cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn throttle_without_fallback_is_429() {
    let app = TestApp::start(Some("test-key")).await;

    let (status, headers, body) = app.get("/proxy?operation=OVERVIEW&symbol=THRT").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["ok"], false);
    assert_eq!(headers[header::RETRY_AFTER], "1");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");

    let (status, headers, _) = app.get("/proxy?operation=OVERVIEW&symbol=LIMIT").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "30");

    // Throttled answers are never cached.
    assert_eq!(std::fs::read_dir(app.cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn throttle_serves_stale_disk_record() {
    let app = TestApp::start(Some("test-key")).await;
    std::fs::write(
        app.cache_dir.path().join("OVERVIEW__THRT.json"),
        r#"{"savedAt":"2020-01-01T00:00:00Z","data":{"Symbol":"THRT","Name":"Old"}}"#,
    )
    .unwrap();

    let (status, headers, body) = app.get("/proxy?operation=OVERVIEW&symbol=THRT").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["source"], "disk-stale");
    assert_eq!(body["stale"], true);
    assert_eq!(body["cached"], true);
    assert_eq!(body["data"], json!({"Symbol": "THRT", "Name": "Old"}));
    assert!(body["warning"].as_str().unwrap().contains("2020-01-01"));
    assert_eq!(headers[header::RETRY_AFTER], "1");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn throttle_serves_fixture() {
    let app = TestApp::start(Some("test-key")).await;
    std::fs::write(
        app.fixtures_dir.path().join("OVERVIEW__THRT.json"),
        r#"{"Symbol":"THRT","Name":"Sample"}"#,
    )
    .unwrap();

    let (status, _, body) = app.get("/proxy?operation=OVERVIEW&symbol=THRT").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fixture");
    assert_eq!(body["stale"], false);
    assert_eq!(body["data"]["Name"], "Sample");
    assert!(body["warning"].is_string());

    // The written-through copy is sample data, never a fresh hit.
    let (status, headers, again) = app.get("/proxy?operation=OVERVIEW&symbol=THRT").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["source"], "fixture");
    assert_eq!(again["stale"], false);
    assert!(again["warning"].is_string());
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    assert_eq!(app.hits(), 2);
}

#[tokio::test]
async fn slow_upstream_is_504() {
    let app = TestApp::start(Some("test-key")).await;

    let (status, headers, body) = app.get("/proxy?operation=OVERVIEW&symbol=SLOW").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["ok"], false);
    assert!(headers.get(header::RETRY_AFTER).is_none());
}

#[tokio::test]
async fn upstream_errors_are_502() {
    let app = TestApp::start(Some("test-key")).await;

    for symbol in ["ERR", "HTML"] {
        let (status, _, body) = app
            .get(&format!("/proxy?operation=OVERVIEW&symbol={symbol}"))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY, "{symbol}");
        assert_eq!(body["ok"], false);
    }
}

#[tokio::test]
async fn wrong_credential_is_502() {
    let app = TestApp::start(Some("wrong-key")).await;

    let (status, _, body) = app.get("/proxy?operation=OVERVIEW&symbol=IBM").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("apikey"));
}

#[tokio::test]
async fn unknown_route_is_enveloped_404() {
    let app = TestApp::start(Some("test-key")).await;

    let (status, _, body) = app.get("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"ok": false, "error": "Not Found"}));
}

// =============================================================================
// Queued requests under the request timeout
// =============================================================================

const QUEUED: [&str; 6] = ["LAG1", "LAG2", "LAG3", "LAG4", "LAG5", "LAG6"];

async fn start_lagging() -> TestApp {
    TestApp::start_with(
        Some("test-key"),
        &[
            ("TP_REQUEST_TIMEOUT_MS", "400"),
            ("TP_MIN_SPACING_MS", "10"),
            ("TP_UPSTREAM_TIMEOUT_MS", "1000"),
        ],
    )
    .await
}

async fn fire_queued(app: &Arc<TestApp>) -> Vec<(StatusCode, Value)> {
    let mut handles = Vec::new();
    for symbol in QUEUED {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, _, body) = app
                .get(&format!("/proxy?operation=OVERVIEW&symbol={symbol}"))
                .await;
            (status, body)
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_requests_always_get_envelopes() {
    let app = Arc::new(start_lagging().await);

    for (status, body) in fire_queued(&app).await {
        assert!(
            status == StatusCode::OK || status == StatusCode::GATEWAY_TIMEOUT,
            "unexpected {status}"
        );
        assert!(body["ok"].is_boolean(), "{body}");
        if status == StatusCode::GATEWAY_TIMEOUT {
            assert_eq!(body["ok"], false);
            assert!(body["error"].is_string());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_requests_reach_the_fallback_chain() {
    let app = start_lagging().await;
    for symbol in QUEUED {
        std::fs::write(
            app.fixtures_dir.path().join(format!("OVERVIEW__{symbol}.json")),
            format!(r#"{{"Symbol":"{symbol}","Name":"Sample"}}"#),
        )
        .unwrap();
    }
    let app = Arc::new(app);

    let results = fire_queued(&app).await;
    for (status, body) in &results {
        assert_eq!(*status, StatusCode::OK, "{body}");
        assert_eq!(body["ok"], true);
    }
    assert!(results.iter().any(|(_, body)| body["source"] == "fixture"));
}
