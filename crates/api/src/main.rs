use std::sync::Arc;

use anyhow::Context;

use durian_api::app::{build_app, services::AppServices};
use durian_infra::LedgerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    durian_observability::init();

    let config = LedgerConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(AppServices::from_config(&config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
