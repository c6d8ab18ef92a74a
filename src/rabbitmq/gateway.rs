// ============================================================================
// Messaging Gateway Facade
// ============================================================================
//
// The only messaging surface the HTTP layer sees: a connection-status query
// and one typed publish method per message category. Pure composition over
// the connection manager, topology registry and publisher — no state of its
// own.
//
// ============================================================================

use std::sync::Arc;

use crate::error::AppResult;
use crate::rabbitmq::connection::ConnectionManager;
use crate::rabbitmq::publisher::Publisher;
use crate::rabbitmq::topology::TopologyRegistry;
use crate::rabbitmq::types::{MessageCategory, OutboundMessage, PublishOutcome};

pub struct MessagingGateway {
    connection: Arc<ConnectionManager>,
    topology: Arc<TopologyRegistry>,
    publisher: Publisher,
}

impl MessagingGateway {
    pub fn new(connection: Arc<ConnectionManager>, topology: Arc<TopologyRegistry>) -> Self {
        let publisher = Publisher::new(connection.clone(), topology.clone());
        Self {
            connection,
            topology,
            publisher,
        }
    }

    /// Last observed broker connectivity. Non-blocking.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Publish a payload under a category; the category's default routing
    /// key is used unless the caller overrides it.
    pub async fn publish(
        &self,
        category: MessageCategory,
        routing_key: Option<&str>,
        payload: serde_json::Value,
    ) -> AppResult<PublishOutcome> {
        let routing_key = match routing_key {
            Some(key) => key.to_string(),
            None => self.topology.default_routing_key(category)?.to_string(),
        };

        self.publisher
            .publish(&OutboundMessage::new(category, routing_key, payload))
            .await
    }

    // Per-category wrappers: routing sugar over `publish`, no extra logic.

    pub async fn publish_user_message(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> AppResult<PublishOutcome> {
        self.publish(MessageCategory::User, Some(routing_key), payload)
            .await
    }

    pub async fn publish_notification_message(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> AppResult<PublishOutcome> {
        self.publish(MessageCategory::Notification, Some(routing_key), payload)
            .await
    }

    pub async fn publish_email_message(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> AppResult<PublishOutcome> {
        self.publish(MessageCategory::Email, Some(routing_key), payload)
            .await
    }

    pub async fn publish_log_message(
        &self,
        routing_key: &str,
        payload: serde_json::Value,
    ) -> AppResult<PublishOutcome> {
        self.publish(MessageCategory::Log, Some(routing_key), payload)
            .await
    }
}
