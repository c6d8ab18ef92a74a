// ============================================================================
// AllInOne Backend
// ============================================================================
//
// Small HTTP backend whose core is an asynchronous RabbitMQ messaging
// gateway: domain events are published to an exchange/routing-key topology
// and consumed through durable queue bindings, while the HTTP path stays up
// regardless of broker health.
//
// Modules:
// - config: environment-driven configuration
// - error: application error type and HTTP mapping
// - rabbitmq: topology, connection supervision, publisher, subscribers
// - routes: axum HTTP surface
// - auth / user_service: JWT login and the demo user endpoints
//
// ============================================================================

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod rabbitmq;
pub mod response;
pub mod routes;
pub mod user_service;
pub mod utils;

pub use error::{AppError, AppResult};

/// Future that resolves when the process receives a shutdown signal.
///
/// Used with `axum::serve(...).with_graceful_shutdown(...)` so in-flight
/// requests drain before the broker connection is closed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
