// ============================================================================
// Messaging Gateway HTTP Tests
// ============================================================================
//
// Exercise the /rabbitmq/test/* endpoints against an app whose broker
// endpoint is unreachable: the status endpoint must report the truth and
// the publish endpoints must stay fast and success-shaped while the
// publisher skips delivery.
//
// ============================================================================

use serde_json::json;
use serial_test::serial;
use std::time::{Duration, Instant};

mod test_utils;
use test_utils::spawn_app;

#[tokio::test]
#[serial]
async fn test_status_reports_disconnected_broker() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/rabbitmq/test/status", app.address))
        .send()
        .await
        .expect("status request failed");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "success");
    assert_eq!(body["data"]["connected"], false);
    assert!(body["data"]["message"].is_string());

    let timestamp = body["data"]["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
#[serial]
async fn test_publish_user_message_echoes_payload_when_broker_unreachable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rabbitmq/test/user", app.address))
        .json(&json!({"message": "hello"}))
        .send()
        .await
        .expect("publish request failed");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 0);

    let data = &body["data"];
    assert_eq!(data["message"], "hello");
    assert_eq!(data["type"], "test");
    assert!(data["id"].is_i64());
    assert!(
        chrono::DateTime::parse_from_rfc3339(data["timestamp"].as_str().unwrap()).is_ok()
    );
    // level only appears on log messages
    assert!(data.get("level").is_none());
}

#[tokio::test]
#[serial]
async fn test_all_test_endpoints_return_success_shape() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["user", "notification", "email", "log"] {
        let response = client
            .post(format!("{}/rabbitmq/test/{}", app.address, path))
            .json(&json!({"message": "ping"}))
            .send()
            .await
            .expect("publish request failed");
        assert_eq!(response.status(), 200, "endpoint {} failed", path);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], 0, "endpoint {} envelope", path);
        assert_eq!(body["data"]["message"], "ping");
        assert_eq!(body["data"]["type"], "test");
    }
}

#[tokio::test]
#[serial]
async fn test_log_message_carries_info_level() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rabbitmq/test/log", app.address))
        .json(&json!({"message": "logged"}))
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["level"], "info");
}

#[tokio::test]
#[serial]
async fn test_missing_body_falls_back_to_default_message() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rabbitmq/test/user", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["message"], "test user message");
}

#[tokio::test]
#[serial]
async fn test_skipped_publish_is_bounded_and_never_errors() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let start = Instant::now();
    let response = client
        .post(format!("{}/rabbitmq/test/notification", app.address))
        .json(&json!({"message": "fast"}))
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status(), 200);
    assert!(
        elapsed < Duration::from_secs(2),
        "skipped publish took {:?}",
        elapsed
    );
}
