use std::sync::Arc;

use anyhow::Context;

use nightstocker_web::app;
use nightstocker_web::config::ConfigLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new().load().context("loading configuration")?;
    nightstocker_observability::init(&config.log.filter, config.log.format);

    let services = app::build_services(&config)
        .await
        .context("starting inventory services")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
