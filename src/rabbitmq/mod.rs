// ============================================================================
// RabbitMQ Messaging Gateway
// ============================================================================
//
// - types: message categories and the outbound message envelope
// - topology: exchanges, queues and bindings as validated static data
// - connection: supervised broker connection with reconnect backoff
// - publisher: best-effort, fire-and-forget publishing
// - subscriber: per-binding consumers with isolated handlers
// - gateway: the facade the HTTP layer talks to
//
// ============================================================================

pub mod connection;
pub mod gateway;
pub mod publisher;
pub mod subscriber;
pub mod topology;
pub mod types;

pub use connection::{ConnectionManager, ConnectionState};
pub use gateway::MessagingGateway;
pub use publisher::Publisher;
pub use subscriber::{log_handler, MessageHandler, SubscriberRegistry};
pub use topology::{
    BindingDescriptor, CategoryRoute, ExchangeDescriptor, ExchangeType, QueueDescriptor,
    TopologyRegistry,
};
pub use types::{MessageCategory, OutboundMessage, PublishOutcome};
