use std::net::SocketAddr;
use std::sync::Arc;

use glow_api::{app, AppState, AuthConfig};
use glow_core::{LogNotifier, OrderNotifier, OrderService};
use glow_store::{Config, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glow_api=debug,glow_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Glow API on port {}", config.server.port);

    let db = DbClient::new(&config.database).await?;
    db.migrate().await?;

    let service = OrderService::new(db.users(), db.products(), db.orders(), build_notifier(&config)?)
        .with_shipping_table(config.shipping.clone());

    let app_state = AppState {
        service,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "kafka")]
fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn OrderNotifier>> {
    match &config.kafka {
        Some(kafka) => {
            tracing::info!("Publishing order events to {}", kafka.brokers);
            Ok(Arc::new(glow_store::KafkaOrderNotifier::new(kafka)?))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

#[cfg(not(feature = "kafka"))]
fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn OrderNotifier>> {
    if config.kafka.is_some() {
        tracing::warn!("Kafka is configured but this build lacks the `kafka` feature; logging notifications instead");
    }
    Ok(Arc::new(LogNotifier))
}
