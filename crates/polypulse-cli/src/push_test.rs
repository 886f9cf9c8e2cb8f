use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn test_client(base_url: &str, token: Option<&str>) -> PushClient {
    PushClient::new(base_url, token.map(str::to_string), 30)
        .expect("client construction should not fail")
}

fn temp_batch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("polypulse-{}-{name}.json", std::process::id()))
}

#[tokio::test]
async fn push_feed_wraps_batch_and_parses_counts() {
    let server = MockServer::start().await;
    let feed = json!([{"id": "1"}]);

    Mock::given(method("POST"))
        .and(path("/api/v1/feed"))
        .and(header("authorization", "Bearer pusher-key"))
        .and(body_json(json!({ "feed": feed })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "sequence": 4,
                "posts_received": 1,
                "posts_saved": 1,
                "posts_skipped": 0,
                "posts_errors": 0,
                "processing_time_ms": 12,
                "summary": {"total_posts": 1}
            },
            "meta": {"request_id": "r-1", "timestamp": "2025-06-01T12:00:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), Some("pusher-key"));
    let result = client.push_feed(&feed).await.expect("push should succeed");

    assert_eq!(
        result,
        PushResult {
            sequence: 4,
            posts_received: 1,
            posts_saved: 1,
            posts_skipped: 0,
            posts_errors: 0,
            processing_time_ms: 12,
        }
    );
}

#[tokio::test]
async fn push_feed_surfaces_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/feed"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "validation_error", "message": "feed must be an array of posts"},
            "meta": {"request_id": "r-2", "timestamp": "2025-06-01T12:00:00Z"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None);
    let err = client
        .push_feed(&json!({"not": "an array"}))
        .await
        .expect_err("server rejects payload");

    match err {
        PushError::Rejected { status, code, .. } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(code, "validation_error");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn push_feed_handles_non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/feed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), None);
    let err = client.push_feed(&json!([])).await.expect_err("server down");

    assert!(matches!(
        err,
        PushError::Rejected { status, ref code, .. }
            if status == StatusCode::SERVICE_UNAVAILABLE && code == "unknown"
    ));
}

#[tokio::test]
async fn statistics_returns_data_member() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "posts": {"total_posts": 3},
                "feeding": {"feeding_status": "good"}
            },
            "meta": {"request_id": "r-3", "timestamp": "2025-06-01T12:00:00Z"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/", server.uri()), None);
    let data = client.statistics().await.expect("statistics");

    assert_eq!(data["posts"]["total_posts"], 3);
    assert_eq!(data["feeding"]["feeding_status"], "good");
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        PushClient::new("not a url", None, 5),
        Err(PushError::InvalidUrl { .. })
    ));
}

#[test]
fn load_batch_file_accepts_bare_array_and_wrapped_feed() {
    let bare = temp_batch_path("bare");
    std::fs::write(&bare, r#"[{"id": "1"}, {"id": "2"}]"#).expect("write bare");
    let feed = load_batch_file(&bare).expect("load bare");
    assert_eq!(feed.as_array().map(Vec::len), Some(2));

    let wrapped = temp_batch_path("wrapped");
    std::fs::write(&wrapped, r#"{"feed": [{"id": "1"}]}"#).expect("write wrapped");
    let feed = load_batch_file(&wrapped).expect("load wrapped");
    assert_eq!(feed.as_array().map(Vec::len), Some(1));

    std::fs::remove_file(bare).ok();
    std::fs::remove_file(wrapped).ok();
}

#[test]
fn load_batch_file_reports_bad_json() {
    let broken = temp_batch_path("broken");
    std::fs::write(&broken, "[{").expect("write broken");

    assert!(matches!(load_batch_file(&broken), Err(PushError::Json(_))));
    std::fs::remove_file(broken).ok();
}
