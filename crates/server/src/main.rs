use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, routes};
use tower_http::cors::CorsLayer;
use tracing::info;
use utils::{
    env::{load_dotenv, parse_or, var_or},
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let deployment = DeploymentImpl::new()
        .await
        .context("failed to initialise deployment")?;

    let app = routes::router(deployment).layer(CorsLayer::permissive());

    let host = var_or("HOST", "127.0.0.1");
    let port: u16 = parse_or("PORT", 3001);
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!("Server running on http://{host}:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}
