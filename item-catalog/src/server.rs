//! The main server: the catalog store behind the HTTP server, plus the metrics endpoint.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use iroh_metrics::Registry;
use tracing::{debug, info};

use crate::{
    config::Config, http::HttpServer, metrics::Metrics, session::Sessions, state::AppState,
    store::CatalogStore, templates::Templates,
};

/// Spawn the server and run until the `Ctrl-C` signal is received, then shutdown.
pub async fn run_with_config_until_ctrl_c(config: Config) -> Result<()> {
    let store = CatalogStore::persistent(Config::catalog_store_path()?)?;
    let server = Server::spawn(config, store).await?;
    tokio::signal::ctrl_c().await?;
    info!("shutdown");
    server.shutdown().await?;
    Ok(())
}

/// The item-catalog server.
pub struct Server {
    http_server: HttpServer,
    metrics: Arc<Metrics>,
    metrics_task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("http_server", &self.http_server)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Spawn the server.
    ///
    /// Seeds the configured categories into `store`, then spawns the HTTP server task and,
    /// unless disabled, the metrics server task.
    pub async fn spawn(config: Config, store: CatalogStore) -> Result<Self> {
        store
            .ensure_categories(config.catalog.categories.iter().map(String::as_str))
            .context("failed to seed categories")?;

        let metrics = Arc::new(Metrics::default());
        let state = AppState {
            store,
            templates: Templates::new()?,
            sessions: Sessions::new(config.catalog.session_capacity),
            metrics: metrics.clone(),
            latest_items: config.catalog.latest_items,
        };

        let metrics_addr = config.metrics_addr();
        let metrics_task = tokio::task::spawn({
            let metrics = metrics.clone();
            async move {
                if let Some(addr) = metrics_addr {
                    debug!("starting metrics server on {addr}");
                    let mut registry = Registry::default();
                    registry.register(metrics);
                    let registry = Arc::new(RwLock::new(registry));
                    iroh_metrics::service::start_metrics_server(addr, registry)
                        .await
                        .context("metrics server failed")?;
                }
                Ok(())
            }
        });
        let http_server = HttpServer::spawn(config.http, state).await?;
        Ok(Self {
            http_server,
            metrics,
            metrics_task,
        })
    }

    /// The metrics recorded by this server.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Cancel the server tasks and wait for all tasks to complete.
    pub async fn shutdown(self) -> Result<()> {
        self.metrics_task.abort();
        self.http_server.shutdown().await
    }

    /// Wait for all tasks to complete.
    ///
    /// This will run forever unless the HTTP server fails.
    pub async fn run_until_error(self) -> Result<()> {
        let res = self.http_server.run_until_done().await;
        self.metrics_task.abort();
        res
    }

    /// Spawn a server suitable for testing.
    ///
    /// This will run the HTTP server on a random localhost port with an in-memory store and
    /// without metrics server.
    ///
    /// It returns the server handle and the [`Url`](url::Url) of the HTTP server.
    #[cfg(test)]
    pub async fn spawn_for_tests() -> Result<(Self, url::Url)> {
        use crate::config::MetricsConfig;
        use std::net::{IpAddr, Ipv4Addr};

        let mut config = Config::default();
        config.http.port = 0;
        config.http.bind_addr = Some(IpAddr::V4(Ipv4Addr::LOCALHOST));
        config.metrics = Some(MetricsConfig::disabled());
        config.catalog.categories = vec!["Soccer".to_string(), "Hockey".to_string()];
        config.catalog.latest_items = 3;

        let store = CatalogStore::in_memory()?;
        let server = Self::spawn(config, store).await?;
        let http_addr = server.http_server.http_addr();
        let http_url = format!("http://{http_addr}").parse()?;
        Ok((server, http_url))
    }
}
