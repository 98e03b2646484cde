use std::{net::SocketAddr, sync::Arc};

use resource_observability_mcp::{
    build_app,
    config::{Config, ProviderKind},
    domain::facade::QueryFacade,
    logging,
    provider::ResourceProvider,
    systemd_client::DbusSystemdClient,
    AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logging::init_logging(config.log_format);

    let provider: Option<Arc<dyn ResourceProvider>> = match config.provider {
        ProviderKind::Systemd => Some(Arc::new(DbusSystemdClient::new())),
        ProviderKind::Disabled => None,
    };
    let facade = QueryFacade::new(provider, config.log_limits);
    if !facade.is_available() {
        warn!(
            provider = ?config.provider,
            "resource provider is not available; tools will report it to clients"
        );
    }

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.api_token.clone(), config.allowed_cidr, facade);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        max_log_lines = config.log_limits.max_lines,
        log_timeout_secs = config.log_limits.timeout.as_secs(),
        "server starting"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
