mod api;
mod executor;
mod jobs;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rescrawl_export::FileSink;
use rescrawl_scraper::{load_site_locators, SiteLocators};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    executor::BrowserExecutor,
    jobs::JobManager,
};

/// Half-second polls; the crawl stops at its next date boundary.
const SHUTDOWN_WAIT_POLLS: u32 = 120;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(rescrawl_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let locators = match &config.locators_path {
        Some(path) => load_site_locators(path)
            .with_context(|| format!("failed to load locators from {}", path.display()))?,
        None => SiteLocators::default(),
    };

    let sink = FileSink::new(config.output_dir.clone());
    let executor = BrowserExecutor::new(Arc::clone(&config), Arc::new(locators), sink.clone());
    let jobs = JobManager::new(Arc::new(executor), config.store_name.clone());

    let _scheduler = scheduler::build_scheduler(jobs.clone(), &config).await?;

    let app = build_app(AppState {
        jobs: jobs.clone(),
        sink,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if jobs.cancel() {
        tracing::info!("waiting for the running crawl to stop");
        for _ in 0..SHUTDOWN_WAIT_POLLS {
            if !jobs.status().running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
