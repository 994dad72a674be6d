use std::net::SocketAddr;

use anyhow::Context;

use userdesk_api::app::{build_app, services::build_services};
use userdesk_infra::AppConfig;
use userdesk_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    if config.json_logs {
        userdesk_observability::init();
    } else {
        userdesk_observability::init_with(LogFormat::Pretty);
    }

    let services = build_services(&config).await?;
    let app = build_app(&config, services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = ?config.environment,
        disclosure = ?config.disclosure,
        rate_limited = config.rate_limit.is_some(),
        "listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;

    Ok(())
}
