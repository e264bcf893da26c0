mod config;
mod models;
mod routes;
mod storage;

use axum::{Router, extract::DefaultBodyLimit};
use config::ServiceConfig;
use storage::SessionStorage;
use tower_http::cors::{CorsLayer, Any};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_monitor=debug,event_parser=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let storage = SessionStorage::new(&config.data_dir)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_routes(storage))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(cors);

    tracing::info!(
        "Starting event monitor on {} (data dir: {})",
        config.addr,
        config.data_dir.display()
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
