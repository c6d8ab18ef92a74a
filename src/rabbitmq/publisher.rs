// ============================================================================
// Message Publisher
// ============================================================================
//
// Best-effort, fire-and-forget publishing. A publish performs at most one
// network write and returns; when the broker is down the message is dropped
// with a warning and the caller gets a non-fatal Skipped outcome, so an
// outage never blocks or fails the HTTP request that triggered the publish.
//
// ============================================================================

use std::sync::Arc;

use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::rabbitmq::connection::ConnectionManager;
use crate::rabbitmq::topology::TopologyRegistry;
use crate::rabbitmq::types::{OutboundMessage, PublishOutcome};

pub struct Publisher {
    connection: Arc<ConnectionManager>,
    topology: Arc<TopologyRegistry>,
}

impl Publisher {
    pub fn new(connection: Arc<ConnectionManager>, topology: Arc<TopologyRegistry>) -> Self {
        Self {
            connection,
            topology,
        }
    }

    /// Publish one message to its category's exchange.
    ///
    /// An unknown category is a configuration error: logged and returned,
    /// nothing is sent. A missing connection degrades to `Ok(Skipped)`.
    /// An I/O failure on a live channel is logged and re-raised as
    /// `AppError::Publish`, never retried here. There is no idempotency
    /// key: duplicate calls produce duplicate messages.
    pub async fn publish(&self, message: &OutboundMessage) -> AppResult<PublishOutcome> {
        let exchange = self.topology.resolve_exchange(message.category).map_err(|e| {
            tracing::error!(
                category = %message.category,
                error = %e,
                "No exchange registered for message category"
            );
            e
        })?;

        if !self.connection.is_connected() {
            tracing::warn!(
                category = %message.category,
                routing_key = %message.routing_key,
                "RabbitMQ not connected, skipping message publish"
            );
            return Ok(PublishOutcome::Skipped);
        }

        let Some(channel) = self.connection.current_channel().await else {
            // Connection flipped between the state check and the snapshot
            tracing::warn!(
                category = %message.category,
                routing_key = %message.routing_key,
                "RabbitMQ channel unavailable, skipping message publish"
            );
            return Ok(PublishOutcome::Skipped);
        };

        let body = serde_json::to_vec(&message.payload)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_message_id(Uuid::new_v4().to_string().into())
            .with_timestamp(message.produced_at.timestamp() as u64);

        channel
            .basic_publish(
                &exchange.name,
                &message.routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    exchange = %exchange.name,
                    routing_key = %message.routing_key,
                    error = %e,
                    "Failed to publish message"
                );
                AppError::Publish(e.to_string())
            })?;

        tracing::info!(
            exchange = %exchange.name,
            routing_key = %message.routing_key,
            "Message published"
        );

        Ok(PublishOutcome::Published)
    }
}
