mod alias;
mod api;
mod backend;
mod extract;
mod health;
mod metrics;
mod state;
#[cfg(test)]
mod testing;

use crate::metrics::GatewayMetrics;
use crate::state::AppState;
use anyhow::Result;
use axum::ServiceExt;
use axum::extract::Request;
use bingo_common::config::AppConfig;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env()?;
    let backend = backend::build_backend(&config)?;
    let metrics = Arc::new(GatewayMetrics::new()?);

    info!(
        mode = %config.backend_mode,
        game = %config.game_base,
        validation = %config.validation_base,
        "backend adapter ready"
    );

    let state = AppState {
        backend,
        metrics,
        health_timeout: config.health_check_timeout(),
    };
    let app = api::app(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("gateway listening on {}", addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}
