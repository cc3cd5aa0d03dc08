use anyhow::Result;
use ercole_client::{AlertServiceClient, ApiServiceClient};
use ercole_engine::jobs::{ArchivedHostCleaningJob, FreshnessCheckJob};
use ercole_engine::ports::{AlertSink, ApiClient, HostStore};
use ercole_engine::{system_clock, HostDataService};
use ercole_server::scheduler::{ArchivedHostCleaningScheduler, FreshnessCheckScheduler};
use ercole_server::state::AppState;
use ercole_server::{app, config};
use ercole_storage::HostDataStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: ercole-data-service [config.toml]");
    eprintln!();
    eprintln!("  config.toml  defaults to config/data-service.toml");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ercole=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or("config/data-service.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load(config_path)?;
    ercole_common::id::init(config.node_id);

    if config.freshness_check.enabled && config.freshness_check.days_threshold <= 0 {
        anyhow::bail!(
            "freshness_check.days_threshold must be higher than 0, got {}",
            config.freshness_check.days_threshold
        );
    }

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        alert_service = %config.alert_service.remote_endpoint,
        api_service = %config.api_service.remote_endpoint,
        "ercole-data-service starting"
    );

    let store: Arc<dyn HostStore> = Arc::new(
        HostDataStore::new(
            &config.database.connection_url(),
            Path::new(&config.database.data_dir),
        )
        .await?,
    );
    let alert_sink: Arc<dyn AlertSink> =
        Arc::new(AlertServiceClient::new(config.alert_service.clone()));
    let api: Arc<dyn ApiClient> = Arc::new(ApiServiceClient::new(config.api_service.clone()));
    let clock = system_clock();

    let service = Arc::new(HostDataService::new(
        store.clone(),
        alert_sink.clone(),
        api,
        config.engine_config(),
        clock.clone(),
    ));
    let state = AppState::new(service, config.clone());

    let http_addr: SocketAddr = format!("{}:{}", config.bind_ip, config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app);

    let freshness_handle = if config.freshness_check.enabled {
        let scheduler = FreshnessCheckScheduler::new(
            FreshnessCheckJob::new(
                store.clone(),
                alert_sink.clone(),
                config.freshness_check.days_threshold,
                clock.clone(),
            ),
            config.freshness_check.tick_secs,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Freshness check scheduler disabled");
        None
    };

    let cleaning_handle = if config.archived_host_cleaning.enabled {
        let scheduler = ArchivedHostCleaningScheduler::new(
            ArchivedHostCleaningJob::new(
                store.clone(),
                config.archived_host_cleaning.hours_threshold,
                clock.clone(),
            ),
            config.archived_host_cleaning.tick_secs,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Archived host cleaning scheduler disabled");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = http_server
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(h) = freshness_handle {
        h.abort();
    }
    if let Some(h) = cleaning_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
