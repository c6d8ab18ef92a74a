use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use allinone_backend::auth::AuthManager;
use allinone_backend::config::Config;
use allinone_backend::context::AppContext;
use allinone_backend::rabbitmq::{
    log_handler, ConnectionManager, MessagingGateway, SubscriberRegistry, TopologyRegistry,
};
use allinone_backend::user_service::{InMemoryUserStore, UserStore};
use allinone_backend::{routes, shutdown_signal};

// Startup grace period for the initial broker connection. Not a hard
// requirement: when it elapses the server comes up anyway and publishes
// degrade to skipped until the supervisor gets through.
const STARTUP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    let config = Arc::new(config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== AllInOne Backend Starting ===");
    info!("Port: {}", config.port);

    // Messaging gateway: topology, supervised connection, consumers, facade
    let topology = Arc::new(TopologyRegistry::standard()?);
    let connection = Arc::new(ConnectionManager::new(&config.amqp, topology.clone()));

    let mut subscribers = SubscriberRegistry::new(connection.clone(), topology.clone());
    for binding in topology.list_bindings() {
        subscribers.register(binding.clone(), log_handler(binding.queue.clone()))?;
    }
    subscribers.start();

    let gateway = Arc::new(MessagingGateway::new(connection.clone(), topology.clone()));

    match connection.await_connection(STARTUP_CONNECT_TIMEOUT).await {
        Ok(()) => info!("Connected to RabbitMQ"),
        Err(e) => tracing::warn!(
            error = %e,
            "Starting without a RabbitMQ connection; publishes will be skipped until the broker is reachable"
        ),
    }

    // Auth manager and user store
    let auth_manager = Arc::new(AuthManager::new(&config));
    let user_store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::seeded());

    // Create application context
    let context = Arc::new(AppContext::new(
        config.clone(),
        gateway,
        auth_manager,
        user_store,
    ));

    // Create router and start server
    let app = routes::create_router(context);

    let bind_address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .context("Failed to bind to address")?;
    info!("AllInOne backend listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    // Drain the broker connection after the HTTP server stops
    connection.close().await;
    info!("Shutdown complete");

    Ok(())
}
