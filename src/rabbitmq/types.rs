use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical category of a published message
///
/// Closed enumeration; each category maps 1:1 to one exchange in the
/// topology registry and carries a default routing key for the common case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MessageCategory {
    /// User lifecycle events (registration, profile changes)
    User,

    /// In-app notification events
    Notification,

    /// Outbound email requests
    Email,

    /// Application log/audit events
    Log,
}

impl MessageCategory {
    pub const ALL: [MessageCategory; 4] = [
        MessageCategory::User,
        MessageCategory::Notification,
        MessageCategory::Email,
        MessageCategory::Log,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageCategory::User => "user",
            MessageCategory::Notification => "notification",
            MessageCategory::Email => "email",
            MessageCategory::Log => "log",
        }
    }

    /// Routing key used when the caller does not supply one
    pub fn default_routing_key(&self) -> &'static str {
        match self {
            MessageCategory::User => "user.created",
            MessageCategory::Notification => "notification.sent",
            MessageCategory::Email => "email.sent",
            MessageCategory::Log => "log.created",
        }
    }
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a publish call
///
/// `Skipped` is the best-effort degradation: the broker was not reachable,
/// the message was dropped after a warning log, and the caller carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the broker channel
    Published,
    /// Dropped because no connection was available
    Skipped,
}

/// A message on its way to the broker
///
/// Constructed per publish call, consumed by the publisher, then discarded.
/// Any buffering is the broker's responsibility — the gateway never queues.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub category: MessageCategory,
    pub routing_key: String,
    pub payload: serde_json::Value,
    pub produced_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(
        category: MessageCategory,
        routing_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            category,
            routing_key: routing_key.into(),
            payload,
            produced_at: Utc::now(),
        }
    }
}
