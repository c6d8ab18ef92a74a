// ============================================================================
// Subscriber Registry
// ============================================================================
//
// One handler per declared queue binding, registered once at startup.
// Consumers are (re)spawned on every transition into Connected because
// broker-side consumer registration does not survive a dropped connection.
// A handler failure is terminal at the dispatch boundary: the error is
// logged with the message content and the delivery is acked anyway, so one
// bad message never stops the consumption loop.
//
// ============================================================================

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions};
use lapin::types::FieldTable;
use lapin::Channel;

use crate::error::{AppError, AppResult};
use crate::rabbitmq::connection::{ConnectionManager, ConnectionState};
use crate::rabbitmq::topology::{BindingDescriptor, TopologyRegistry};

/// Handler invoked once per incoming message on its queue's consumer task.
pub type MessageHandler =
    Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A binding paired with its handler; created at startup, never mutated.
#[derive(Clone)]
pub struct Subscription {
    pub binding: BindingDescriptor,
    pub handler: MessageHandler,
}

pub struct SubscriberRegistry {
    connection: Arc<ConnectionManager>,
    topology: Arc<TopologyRegistry>,
    subscriptions: Vec<Subscription>,
}

impl SubscriberRegistry {
    pub fn new(connection: Arc<ConnectionManager>, topology: Arc<TopologyRegistry>) -> Self {
        Self {
            connection,
            topology,
            subscriptions: Vec::new(),
        }
    }

    /// Register a handler for a binding. Call once per binding at startup.
    pub fn register(&mut self, binding: BindingDescriptor, handler: MessageHandler) -> AppResult<()> {
        if !self.topology.has_exchange(&binding.exchange) {
            return Err(AppError::DanglingReference(binding.exchange));
        }
        if !self.topology.has_queue(&binding.queue) {
            return Err(AppError::DanglingReference(binding.queue));
        }
        if self.subscriptions.iter().any(|s| s.binding == binding) {
            return Err(AppError::DuplicateBinding {
                exchange: binding.exchange,
                queue: binding.queue,
                pattern: binding.routing_pattern,
            });
        }

        tracing::debug!(
            queue = %binding.queue,
            exchange = %binding.exchange,
            pattern = %binding.routing_pattern,
            "Registered message handler"
        );
        self.subscriptions.push(Subscription { binding, handler });
        Ok(())
    }

    /// Begin consuming. Waits for Connected, spawns one consumer task per
    /// subscription, and re-arms them after every reconnect.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(run(self.connection, self.subscriptions))
    }
}

async fn run(connection: Arc<ConnectionManager>, subscriptions: Vec<Subscription>) {
    if subscriptions.is_empty() {
        tracing::warn!("Subscriber registry started with no registered handlers");
        return;
    }

    let mut state_rx = connection.subscribe();

    loop {
        // Wait until the connection manager reports a live channel
        if state_rx
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Closing))
            .await
            .is_err()
        {
            break;
        }
        if *state_rx.borrow() == ConnectionState::Closing {
            break;
        }

        let Some(channel) = connection.current_channel().await else {
            // The channel slot is populated before Connected is announced;
            // hitting this means the connection dropped again already.
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            continue;
        };

        for subscription in &subscriptions {
            tokio::spawn(consume_loop(channel.clone(), subscription.clone()));
        }
        tracing::info!(consumers = subscriptions.len(), "Consumers armed");

        // Old consumer tasks die with their channel; re-arm on the next
        // transition into Connected.
        if state_rx
            .wait_for(|s| *s != ConnectionState::Connected)
            .await
            .is_err()
        {
            break;
        }
        if *state_rx.borrow() == ConnectionState::Closing {
            break;
        }
    }

    tracing::info!("Subscriber registry stopped");
}

/// Sequentially process deliveries for one subscription.
///
/// Sequential dispatch within the task preserves the broker's per-queue
/// delivery order; different queues run on different tasks.
async fn consume_loop(channel: Channel, subscription: Subscription) {
    let queue = subscription.binding.queue.clone();
    let consumer_tag = format!("{}:{}", queue, subscription.binding.routing_pattern);

    let mut consumer = match channel
        .basic_consume(
            &queue,
            &consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
    {
        Ok(consumer) => consumer,
        Err(e) => {
            tracing::error!(queue = %queue, error = %e, "Failed to start consumer");
            return;
        }
    };

    tracing::info!(queue = %queue, "Consumer started");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(queue = %queue, error = %e, "Consumer stream error");
                break;
            }
        };

        dispatch(&subscription, delivery.routing_key.as_str(), &delivery.data).await;

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            tracing::warn!(queue = %queue, error = %e, "Failed to ack delivery");
            break;
        }
    }

    tracing::info!(queue = %queue, "Consumer stopped");
}

/// Run one delivery through its handler inside an isolated failure boundary.
///
/// Errors never escape: an unparseable payload or a failing handler is
/// logged and the message is dropped (the caller acks regardless).
pub(crate) async fn dispatch(subscription: &Subscription, routing_key: &str, body: &[u8]) {
    let queue = subscription.binding.queue.as_str();

    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(
                queue = %queue,
                routing_key = %routing_key,
                error = %e,
                "Discarding message with unparseable payload"
            );
            return;
        }
    };

    if let Err(e) = (subscription.handler)(payload.clone()).await {
        tracing::error!(
            queue = %queue,
            routing_key = %routing_key,
            payload = %payload,
            error = %e,
            "Message handler failed, message dropped"
        );
    }
}

/// Default handler: log the received message.
pub fn log_handler(queue: String) -> MessageHandler {
    Arc::new(move |payload: serde_json::Value| {
        let queue = queue.clone();
        Box::pin(async move {
            tracing::info!(queue = %queue, payload = %payload, "Received message");
            Ok(())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rabbitmq::types::MessageCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn binding(queue: &str) -> BindingDescriptor {
        BindingDescriptor {
            exchange: format!("{}-exchange", queue.trim_end_matches("-queue")),
            queue: queue.to_string(),
            routing_pattern: "user.*".to_string(),
        }
    }

    fn counting_handler(counter: Arc<AtomicUsize>, fail: bool) -> MessageHandler {
        Arc::new(move |_payload| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    anyhow::bail!("handler exploded");
                }
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_dispatch() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let subscription = Subscription {
            binding: binding("user-queue"),
            handler: counting_handler(invocations.clone(), true),
        };

        // Both messages run through the handler even though it fails
        dispatch(&subscription, "user.created", br#"{"id": 1}"#).await;
        dispatch(&subscription, "user.created", br#"{"id": 2}"#).await;

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unparseable_payload_is_discarded_before_handler() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let subscription = Subscription {
            binding: binding("user-queue"),
            handler: counting_handler(invocations.clone(), false),
        };

        dispatch(&subscription, "user.created", b"not json at all").await;
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        dispatch(&subscription, "user.created", br#"{"id": 3}"#).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_queue() {
        let topology = Arc::new(TopologyRegistry::standard().unwrap());
        let config = crate::config::AmqpConfig {
            uri: "amqp://127.0.0.1:1/%2f".to_string(),
            retry_attempts: 1,
            retry_delay_ms: 10,
            retry_max_delay_ms: 10,
            backoff: crate::config::BackoffKind::Fixed,
        };
        let connection = Arc::new(ConnectionManager::new(&config, topology.clone()));
        let mut registry = SubscriberRegistry::new(connection, topology);

        let result = registry.register(
            BindingDescriptor {
                exchange: "user-exchange".to_string(),
                queue: "ghost-queue".to_string(),
                routing_pattern: "user.*".to_string(),
            },
            log_handler("ghost-queue".to_string()),
        );
        assert!(matches!(result, Err(AppError::DanglingReference(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_binding() {
        let topology = Arc::new(TopologyRegistry::standard().unwrap());
        let config = crate::config::AmqpConfig {
            uri: "amqp://127.0.0.1:1/%2f".to_string(),
            retry_attempts: 1,
            retry_delay_ms: 10,
            retry_max_delay_ms: 10,
            backoff: crate::config::BackoffKind::Fixed,
        };
        let connection = Arc::new(ConnectionManager::new(&config, topology.clone()));
        let mut registry = SubscriberRegistry::new(connection, topology.clone());

        let first = topology.list_bindings()[0].clone();
        registry
            .register(first.clone(), log_handler(first.queue.clone()))
            .unwrap();

        let result = registry.register(first.clone(), log_handler(first.queue.clone()));
        assert!(matches!(result, Err(AppError::DuplicateBinding { .. })));

        // All four standard bindings register cleanly
        let mut registry = SubscriberRegistry::new(
            Arc::new(ConnectionManager::new(&config, topology.clone())),
            topology.clone(),
        );
        for b in topology.list_bindings() {
            registry
                .register(b.clone(), log_handler(b.queue.clone()))
                .unwrap();
        }
        assert_eq!(MessageCategory::ALL.len(), topology.list_bindings().len());
    }
}
