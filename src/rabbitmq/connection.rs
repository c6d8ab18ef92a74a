// ============================================================================
// Broker Connection Manager
// ============================================================================
//
// Owns the single connection/channel to RabbitMQ. A supervisor task drives
// the state machine (Disconnected -> Connecting -> Connected, back to
// Disconnected on error, Closing only on explicit shutdown) and is the only
// writer of connection state, so at most one reconnect is ever in flight.
// Everyone else observes state through a watch channel and reads a cloned
// channel handle; no caller ever performs broker I/O to answer "are we
// connected".
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::{mpsc, watch, RwLock};

use crate::config::AmqpConfig;
use crate::error::{AppError, AppResult};
use crate::rabbitmq::topology::TopologyRegistry;

/// Observable lifecycle of the broker connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Explicit shutdown; terminal
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        };
        f.write_str(s)
    }
}

/// Supervised handle to the single broker connection
pub struct ConnectionManager {
    state_rx: watch::Receiver<ConnectionState>,
    channel: Arc<RwLock<Option<Channel>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Spawn the connection supervisor and return immediately.
    ///
    /// Startup never blocks on the broker: callers that need a live
    /// connection use `await_connection`, everyone else degrades based on
    /// `is_connected`.
    pub fn new(config: &AmqpConfig, topology: Arc<TopologyRegistry>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let channel = Arc::new(RwLock::new(None));

        tokio::spawn(supervise(
            config.clone(),
            topology,
            state_tx,
            channel.clone(),
            shutdown_rx,
        ));

        Self {
            state_rx,
            channel,
            shutdown_tx,
        }
    }

    /// Last observed connection state. Never performs I/O.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Non-blocking connectivity check. Never performs I/O.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// State-change listener for components that must react to reconnects.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Snapshot of the current channel, if connected.
    pub async fn current_channel(&self) -> Option<Channel> {
        self.channel.read().await.clone()
    }

    /// Block until the connection is established, or fail with
    /// `ConnectionTimeout` once the timeout elapses.
    pub async fn await_connection(&self, timeout: Duration) -> AppResult<()> {
        let mut rx = self.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|s| *s == ConnectionState::Connected))
            .await
            .map_err(|_| AppError::ConnectionTimeout(timeout.as_millis() as u64))?
            .map_err(|_| AppError::internal("connection supervisor stopped"))?;
        Ok(())
    }

    /// Stop the supervisor and close the broker connection. Terminal.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        // The supervisor flips the state to Closing and closes the
        // connection; wait for it so shutdown is observable.
        let mut rx = self.subscribe();
        let _ = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| *s == ConnectionState::Closing),
        )
        .await;
    }
}

/// Supervisor loop: sole owner of the connection lifecycle.
async fn supervise(
    config: AmqpConfig,
    topology: Arc<TopologyRegistry>,
    state_tx: watch::Sender<ConnectionState>,
    channel_slot: Arc<RwLock<Option<Channel>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    'supervisor: loop {
        if *shutdown_rx.borrow() {
            state_tx.send_replace(ConnectionState::Closing);
            break;
        }

        state_tx.send_replace(ConnectionState::Connecting);

        match connect_and_declare(&config.uri, &topology).await {
            Ok((connection, channel)) => {
                attempt = 0;
                *channel_slot.write().await = Some(channel);
                state_tx.send_replace(ConnectionState::Connected);
                tracing::info!("RabbitMQ connection established, topology declared");

                // Surface async connection failures from the client
                let (error_tx, mut error_rx) = mpsc::channel::<lapin::Error>(1);
                connection.on_error(move |e| {
                    let _ = error_tx.try_send(e);
                });

                tokio::select! {
                    maybe_err = error_rx.recv() => {
                        if let Some(e) = maybe_err {
                            tracing::warn!(error = %e, "RabbitMQ connection lost");
                        }
                        channel_slot.write().await.take();
                        state_tx.send_replace(ConnectionState::Disconnected);
                    }
                    _ = shutdown_rx.changed() => {
                        channel_slot.write().await.take();
                        state_tx.send_replace(ConnectionState::Closing);
                        if let Err(e) = connection.close(200, "shutdown").await {
                            tracing::debug!(error = %e, "Error while closing RabbitMQ connection");
                        }
                        break 'supervisor;
                    }
                }
            }
            Err(e) => {
                channel_slot.write().await.take();
                state_tx.send_replace(ConnectionState::Disconnected);
                attempt = attempt.saturating_add(1);

                if config.retry_attempts > 0 && attempt >= config.retry_attempts {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Giving up on RabbitMQ reconnection; staying disconnected"
                    );
                    break;
                }

                let delay = config.retry_delay(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "RabbitMQ connection failed, retrying"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_rx.changed() => {
                        state_tx.send_replace(ConnectionState::Closing);
                        break 'supervisor;
                    }
                }
            }
        }
    }

    tracing::info!("RabbitMQ connection supervisor stopped");
}

/// Open a connection + channel and replay the full topology on it.
///
/// Declaring on every connect keeps the broker-side layout in lockstep with
/// the registry: consumer registration does not survive a dropped
/// connection, and neither do declarations against a freshly started broker.
async fn connect_and_declare(
    uri: &str,
    topology: &TopologyRegistry,
) -> Result<(Connection, Channel)> {
    let connection = Connection::connect(uri, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    let channel = connection
        .create_channel()
        .await
        .context("Failed to open AMQP channel")?;

    for exchange in topology.exchanges() {
        channel
            .exchange_declare(
                &exchange.name,
                exchange.kind.as_lapin(),
                ExchangeDeclareOptions {
                    durable: exchange.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to declare exchange {}", exchange.name))?;
    }

    for queue in topology.queues() {
        channel
            .queue_declare(
                &queue.name,
                QueueDeclareOptions {
                    durable: queue.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to declare queue {}", queue.name))?;
    }

    for binding in topology.list_bindings() {
        channel
            .queue_bind(
                &binding.queue,
                &binding.exchange,
                &binding.routing_pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to bind queue {} to exchange {}",
                    binding.queue, binding.exchange
                )
            })?;
    }

    Ok((connection, channel))
}
