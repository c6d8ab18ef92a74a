// ============================================================================
// Messaging Gateway Component Tests
// ============================================================================
//
// Drive the connection manager and gateway directly against an unreachable
// broker endpoint: state machine behavior, bounded await_connection, and
// the best-effort skip path.
//
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use allinone_backend::rabbitmq::{
    ConnectionManager, ConnectionState, MessageCategory, MessagingGateway, PublishOutcome,
    TopologyRegistry,
};
use allinone_backend::AppError;
use serde_json::json;
use serial_test::serial;

mod test_utils;
use test_utils::test_config;

fn unreachable_manager() -> (Arc<ConnectionManager>, Arc<TopologyRegistry>) {
    let config = test_config();
    let topology = Arc::new(TopologyRegistry::standard().unwrap());
    let connection = Arc::new(ConnectionManager::new(&config.amqp, topology.clone()));
    (connection, topology)
}

#[tokio::test]
#[serial]
async fn test_await_connection_times_out() {
    let (connection, _) = unreachable_manager();

    let start = Instant::now();
    let result = connection.await_connection(Duration::from_millis(300)).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(AppError::ConnectionTimeout(_))));
    assert!(
        elapsed < Duration::from_secs(2),
        "await_connection overran its timeout: {:?}",
        elapsed
    );
}

#[tokio::test]
#[serial]
async fn test_is_connected_is_false_without_broker() {
    let (connection, _) = unreachable_manager();

    // Give the supervisor a moment to run through a connect attempt
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!connection.is_connected());
    assert!(matches!(
        connection.state(),
        ConnectionState::Disconnected | ConnectionState::Connecting
    ));
    assert!(connection.current_channel().await.is_none());
}

#[tokio::test]
#[serial]
async fn test_publish_is_skipped_while_disconnected() {
    let (connection, topology) = unreachable_manager();
    let gateway = MessagingGateway::new(connection, topology);

    for category in MessageCategory::ALL {
        let outcome = gateway
            .publish(category, None, json!({"id": 1, "type": "test"}))
            .await
            .expect("skip path must not raise");
        assert_eq!(outcome, PublishOutcome::Skipped);
    }
}

#[tokio::test]
#[serial]
async fn test_category_sugar_methods_skip_cleanly() {
    let (connection, topology) = unreachable_manager();
    let gateway = MessagingGateway::new(connection, topology);

    let outcome = gateway
        .publish_user_message("user.created", json!({"id": 7}))
        .await
        .unwrap();
    assert_eq!(outcome, PublishOutcome::Skipped);

    let outcome = gateway
        .publish_log_message("log.created", json!({"level": "info"}))
        .await
        .unwrap();
    assert_eq!(outcome, PublishOutcome::Skipped);
}

#[tokio::test]
#[serial]
async fn test_close_is_terminal() {
    let (connection, _) = unreachable_manager();

    connection.close().await;
    assert_eq!(connection.state(), ConnectionState::Closing);

    // Still closing after the retry delay would have elapsed
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(connection.state(), ConnectionState::Closing);
    assert!(!connection.is_connected());
}

#[tokio::test]
#[serial]
async fn test_state_listener_observes_connecting() {
    let (connection, _) = unreachable_manager();
    let mut rx = connection.subscribe();

    // The supervisor must flip through Connecting while retrying
    let seen = tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| *s == ConnectionState::Connecting),
    )
    .await;
    assert!(seen.is_ok(), "never observed a Connecting transition");
}
