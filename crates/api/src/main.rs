use fleetgate_api::app;
use fleetgate_infra::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fleetgate_observability::init();

    let config = AuthConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "refusing to start without a valid configuration");
    })?;

    let auth = app::services::build_services(&config).await?;
    let router = app::build_app(auth);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}
