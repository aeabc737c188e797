use tracing::info;
use tracing_subscriber::EnvFilter;

use wiss_web::config::Config;
use wiss_web::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting wiss web front-end");

    let config = Config::from_env()?;
    info!(
        bind = %config.bind,
        europeana = %config.sparql.endpoints.europeana,
        dbpedia = %config.sparql.endpoints.dbpedia,
        gemet = %config.sparql.endpoints.gemet,
        timeout_ms = config.sparql.timeout.as_millis(),
        max_retries = config.sparql.max_retries,
        gemet_labels = config.gemet_labels,
        "configuration loaded"
    );

    let bind = config.bind;
    let app = create_router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "http server error");
        })?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
