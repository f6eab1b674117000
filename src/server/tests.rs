// HTTP surface tests
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::routes;
use crate::app_state::AppState;
use crate::completion::{CompletionBackend, CompletionError, RetryPolicy};
use crate::csv::{parse_table, summarize};
use crate::settings::{CompletionSettings, Settings};

/// Test helpers
mod helpers {
    use super::*;

    pub struct CannedCompletion(pub String);

    #[async_trait]
    impl CompletionBackend for CannedCompletion {
        async fn send(&self, _prompt: &str) -> Result<String, CompletionError> {
            Ok(self.0.clone())
        }
    }

    pub struct OverloadedCompletion;

    #[async_trait]
    impl CompletionBackend for OverloadedCompletion {
        async fn send(&self, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Transient("service overloaded".into()))
        }
    }

    pub fn test_settings(rate_limit_max: usize, demo_dir: PathBuf) -> Settings {
        Settings {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            completion: CompletionSettings {
                endpoint: "http://127.0.0.1:0".into(),
                model: "test-model".into(),
                api_key: None,
                temperature: 0.0,
                max_tokens: 64,
                request_timeout: Duration::from_secs(1),
            },
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            cache_capacity: 64,
            max_datasets: 16,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: rate_limit_max,
            demo_dir,
        }
    }

    pub fn state_with(completion: Arc<dyn CompletionBackend>, rate_limit_max: usize) -> AppState {
        AppState::new(
            test_settings(rate_limit_max, PathBuf::from("demo-datasets")),
            completion,
        )
    }

    pub fn canned_state() -> AppState {
        state_with(
            Arc::new(CannedCompletion(
                "```json\n{\"answer\":\"Total revenue is $300.50\",\"confidence\":\"high\"}\n```"
                    .to_string(),
            )),
            10,
        )
    }

    pub fn seed_dataset(state: &AppState) -> String {
        let table =
            parse_table("Date,Revenue,Category\n2024-01-01,100.50,A\n2024-01-02,200,B").unwrap();
        let summary = summarize(&table);
        state
            .datasets
            .insert("ecommerce sales".into(), "seeded".into(), table, summary)
            .unwrap()
            .id
            .clone()
    }

    pub fn multipart_body(boundary: &str, csv: &str, name: Option<&str>) -> String {
        let mut body = String::new();
        if let Some(name) = name {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{boundary}--\r\n"
        ));
        body
    }

    pub fn parse_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }
}

use helpers::*;

const BOUNDARY: &str = "----bizlens-test-boundary";

#[tokio::test]
async fn test_health() {
    let routes = routes(canned_state());
    let res = warp::test::request().path("/health").reply(&routes).await;

    assert_eq!(res.status(), 200);
    let body = parse_body(res.body());
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_upload_then_list_and_detail() {
    let state = canned_state();
    let routes = routes(state);

    let body = multipart_body(
        BOUNDARY,
        "Date,Revenue,Category\r\n2024-01-01,100.50,A\r\n2024-01-02,200,B",
        Some("sales demo"),
    );
    let res = warp::test::request()
        .method("POST")
        .path("/api/datasets")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 201);
    let uploaded = parse_body(res.body());
    let id = uploaded["datasetId"].as_str().unwrap().to_string();
    assert_eq!(uploaded["summary"]["totalRows"], 2);
    assert_eq!(
        uploaded["summary"]["numericAggregates"]["Revenue"]["average"],
        150.25
    );

    let res = warp::test::request().path("/api/datasets").reply(&routes).await;
    assert_eq!(res.status(), 200);
    let listing = parse_body(res.body());
    assert_eq!(listing["datasets"].as_array().unwrap().len(), 1);
    assert_eq!(listing["datasets"][0]["name"], "sales demo");
    assert_eq!(listing["datasets"][0]["rowCount"], 2);
    assert_eq!(listing["datasets"][0]["columnCount"], 3);

    let res = warp::test::request()
        .path(&format!("/api/datasets/{}", id))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
    let detail = parse_body(res.body());
    assert_eq!(detail["sampleRows"].as_array().unwrap().len(), 2);
    assert_eq!(detail["sampleRows"][0]["Revenue"], "100.50");
}

#[tokio::test]
async fn test_upload_header_only_is_rejected() {
    let routes = routes(canned_state());

    let body = multipart_body(BOUNDARY, "Date,Revenue,Category", None);
    let res = warp::test::request()
        .method("POST")
        .path("/api/datasets")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 400);
    assert_eq!(parse_body(res.body())["kind"], "invalidInput");
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let routes = routes(canned_state());

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nno file here\r\n--{BOUNDARY}--\r\n"
    );
    let res = warp::test::request()
        .method("POST")
        .path("/api/datasets")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_detail_unknown_dataset() {
    let routes = routes(canned_state());
    let res = warp::test::request()
        .path("/api/datasets/no-such-id")
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 404);
    assert_eq!(parse_body(res.body())["kind"], "notFound");
}

#[tokio::test]
async fn test_query_answers_and_caches() {
    let state = canned_state();
    let id = seed_dataset(&state);
    let routes = routes(state);

    let request = json!({ "question": "What is total revenue?", "datasetId": id });

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&request)
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
    let body = parse_body(res.body());
    assert_eq!(body["answer"]["answer"], "Total revenue is $300.50");
    assert_eq!(body["answer"]["confidence"], "high");
    assert_eq!(body["cached"], false);

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&request)
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
    let body = parse_body(res.body());
    assert_eq!(body["cached"], true);
    assert_eq!(body["answer"]["answer"], "Total revenue is $300.50");
}

#[tokio::test]
async fn test_query_accepts_legacy_field_names() {
    let state = canned_state();
    let id = seed_dataset(&state);
    let routes = routes(state);

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "query": "total?", "datasetId": id }))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_query_missing_fields() {
    let routes = routes(canned_state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "datasetId": "something" }))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 400);

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "question": "where is the id?" }))
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_query_unknown_dataset() {
    let routes = routes(canned_state());

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "question": "anything", "datasetId": "missing" }))
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_query_rate_limited() {
    let state = state_with(
        Arc::new(CannedCompletion("{\"answer\":\"ok\"}".into())),
        2,
    );
    let id = seed_dataset(&state);
    let routes = routes(state);

    for i in 0..2 {
        let res = warp::test::request()
            .method("POST")
            .path("/api/query")
            .json(&json!({ "question": format!("q{}", i), "datasetId": id }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), 200);
    }

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "question": "one too many", "datasetId": id }))
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 429);
    let body = parse_body(res.body());
    assert_eq!(body["kind"], "rateLimited");
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
    assert!(res.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_query_upstream_exhaustion() {
    let state = state_with(Arc::new(OverloadedCompletion), 10);
    let id = seed_dataset(&state);
    let routes = routes(state);

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "question": "anything", "datasetId": id }))
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 500);
    let body = parse_body(res.body());
    assert_eq!(body["kind"], "upstreamFailure");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_query_non_json_completion_falls_back() {
    let state = state_with(
        Arc::new(CannedCompletion("plain text, not JSON at all".into())),
        10,
    );
    let id = seed_dataset(&state);
    let routes = routes(state);

    let res = warp::test::request()
        .method("POST")
        .path("/api/query")
        .json(&json!({ "question": "anything", "datasetId": id }))
        .reply(&routes)
        .await;

    assert_eq!(res.status(), 200);
    let body = parse_body(res.body());
    assert_eq!(body["answer"]["answer"], "plain text, not JSON at all");
    assert_eq!(body["answer"]["confidence"], "medium");
    assert_eq!(body["answer"]["insights"], json!([]));
}

#[tokio::test]
async fn test_demo_load_and_unknown_sample() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("ecommerce-sales.csv"),
        "Date,Revenue,Channel\n2024-01-01,100,web\n2024-01-02,250,store\n",
    )
    .unwrap();

    let state = AppState::new(
        test_settings(10, dir.path().to_path_buf()),
        Arc::new(CannedCompletion("{\"answer\":\"ok\"}".into())),
    );
    let routes = routes(state);

    let res = warp::test::request()
        .method("POST")
        .path("/api/demo/ecommerce")
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 201);
    let body = parse_body(res.body());
    assert_eq!(body["summary"]["totalRows"], 2);

    let res = warp::test::request()
        .method("POST")
        .path("/api/demo/unknown")
        .reply(&routes)
        .await;
    assert_eq!(res.status(), 404);
}
