use std::sync::Arc;

use ad_normalizer::app;
use ad_normalizer::config::settings::AppConfig;
use ad_normalizer::infrastructure::encore::client::EncoreClient;
use ad_normalizer::infrastructure::http::client::build_client;
use ad_normalizer::infrastructure::redis::client::RedisService;
use ad_normalizer::state::AppState;
use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ad_normalizer=info,tower_http=info")),
        )
        .init();

    info!("Starting ad-normalizer...");

    let config = AppConfig::new().context("failed to load configuration")?;
    let http = build_client(config.upstream_timeout).context("failed to build http client")?;
    let redis = Arc::new(
        RedisService::new(&config.redis_url, &config.packaging_queue, config.store_timeout)
            .await
            .context("failed to connect to redis")?,
    );
    let encore = Arc::new(EncoreClient::new(http.clone(), &config));

    info!(
        key_field = ?config.key_rule.field,
        jit_packaging = config.jit_packaging,
        in_flight_ttl = ?config.in_flight_ttl,
        "configuration loaded"
    );

    let port = config.server_port;
    let state = AppState::new(config, redis.clone(), encore, redis, http);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!("🚀 Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
