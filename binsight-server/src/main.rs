//! Binsight server: receives image URLs, asks CamFind what they show, and sorts the answer
//! into Trash, Compost, or Recycling.

use std::future::pending;
use std::sync::Arc;

use anyhow::{Context, Result};
use binsight_classifier::NaiveBayes;
use binsight_core::ClassifyService;
use binsight_provider_camfind::CamFindPort;
use binsight_server::{AppState, Config, logging, router};
use binsight_store_sqlite::SqliteItemStore;
use clap::Parser;
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_json)?;

    // Adapters
    let classifier = NaiveBayes::load(&config.model_path).with_context(|| {
        format!("loading classifier model {}", config.model_path.display())
    })?;

    let client = Client::builder()
        .user_agent("binsight/0.1")
        .timeout(config.request_timeout())
        .build()?;
    let recognition = CamFindPort::new(
        client,
        config.camfind_url.clone(),
        config.camfind_key.clone(),
    );

    let store = SqliteItemStore::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.display()))?;

    let service = ClassifyService::new(
        Arc::new(recognition),
        Arc::new(classifier),
        Arc::new(store),
        config.poll_policy(),
    );
    service.prepare().await.context("preparing item schema")?;

    // HTTP
    let app = router(AppState::new(Arc::new(service)));
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.host, config.port))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = ctrl_c().await {
            error!(%err, "cannot listen for Ctrl+C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "cannot listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
