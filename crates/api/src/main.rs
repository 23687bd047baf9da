use anyhow::Context;

use storefront_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = storefront_api::app::build_app(&config)
        .await
        .context("failed to initialize stores")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        persistent = config.database.is_some(),
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
