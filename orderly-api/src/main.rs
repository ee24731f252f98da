use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use orderly_api::{app, AppState};
use orderly_core::CacheAside;
use orderly_order::{OrchestratorDeps, OrchestratorSettings, OrderMetrics, OrderOrchestrator};
use orderly_remote::{InventoryClient, NotificationClient, PaymentClient, ProductClient};
use orderly_store::{Config, DbClient, KafkaEventPublisher, PostgresOrderRepository, RedisCacheStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderly_api=debug,orderly_order=debug,orderly_remote=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting order service on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let repository = Arc::new(PostgresOrderRepository::new(db.pool.clone()));

    // Redis
    let cache_store = RedisCacheStore::new(&config.redis.url).context("Invalid Redis URL")?;

    // Kafka
    let publisher = KafkaEventPublisher::new(&config.kafka.brokers).context("Failed to create Kafka producer")?;

    let timeout = config.services.request_timeout();
    let inventory = InventoryClient::new(&config.services.inventory_url, timeout)
        .context("Failed to build inventory client")?;
    let prices = ProductClient::new(&config.services.product_url, timeout)
        .context("Failed to build product client")?;
    let notifier = NotificationClient::new(&config.services.notification_url, timeout)
        .context("Failed to build notification client")?;
    let payments = PaymentClient::new(&config.services.payment_url, timeout)
        .context("Failed to build payment client")?;

    let deps = OrchestratorDeps {
        repository,
        prices: Arc::new(prices),
        inventory: Arc::new(inventory),
        notifier: Arc::new(notifier),
        payments: Arc::new(payments),
        publisher: Arc::new(publisher),
        cache: CacheAside::new(Arc::new(cache_store)),
    };
    let settings = OrchestratorSettings {
        topic: config.events.clone(),
        order_ttl: config.cache.order_ttl(),
        batch_workers: config.batch.workers,
        batch_timeout: config.batch.timeout(),
    };
    let metrics = OrderMetrics::new().context("Failed to register metrics")?;
    let orchestrator = OrderOrchestrator::new(deps, settings, metrics);

    let app = app(AppState::new(orchestrator.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Waiting for pending notifications");
    orchestrator.wait_for_background().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
