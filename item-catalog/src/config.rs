//! Configuration for the server

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use crate::{http::HttpConfig, session::DEFAULT_SESSION_CAPACITY};

const DEFAULT_METRICS_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9118);

/// Number of items listed on the front page by default.
pub const DEFAULT_LATEST_ITEMS: usize = 10;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ITEM_CATALOG_DATA_DIR";

/// Server configuration
///
/// The config is usually loaded from a file with [`Self::load`].
///
/// The struct also implements [`Default`] which creates a config suitable for local development
/// and testing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Config for the HTTP server
    #[serde(default)]
    pub http: HttpConfig,
    /// Config for the metrics server.
    ///
    /// The metrics server is started by default. To disable the metrics server, set to
    /// `Some(MetricsConfig::disabled())`.
    pub metrics: Option<MetricsConfig>,
    /// Catalog contents and behaviour.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// The config for the metrics server.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Set to true to disable the metrics server.
    pub disabled: bool,
    /// Optionally set a custom address to bind to.
    pub bind_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    /// Disable the metrics server.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            bind_addr: None,
        }
    }
}

/// The config for the catalog itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Categories created on startup if they do not exist yet.
    pub categories: Vec<String>,
    /// Number of items shown on the front page.
    pub latest_items: usize,
    /// Maximum number of browser sessions kept in memory.
    pub session_capacity: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            categories: [
                "Soccer",
                "Basketball",
                "Baseball",
                "Frisbee",
                "Snowboarding",
                "Rock Climbing",
                "Foosball",
                "Skating",
                "Hockey",
            ]
            .map(String::from)
            .to_vec(),
            latest_items: DEFAULT_LATEST_ITEMS,
            session_capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

impl Config {
    /// Load the config from a file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Config> {
        let s = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("failed to read {}", path.as_ref().to_string_lossy()))?;
        let config: Config = toml::from_str(&s)?;
        Ok(config)
    }

    /// Get the data directory.
    pub fn data_dir() -> Result<PathBuf> {
        let dir = if let Some(val) = env::var_os(DATA_DIR_ENV) {
            PathBuf::from(val)
        } else {
            let path = dirs_next::data_dir().ok_or_else(|| {
                anyhow!("operating environment provides no directory for application data")
            })?;
            path.join("item-catalog")
        };
        Ok(dir)
    }

    /// Get the path to the catalog database file.
    pub fn catalog_store_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("catalog-1.db"))
    }

    /// Get the address where the metrics server should be bound, if set.
    pub(crate) fn metrics_addr(&self) -> Option<SocketAddr> {
        match &self.metrics {
            None => Some(DEFAULT_METRICS_ADDR),
            Some(conf) => match conf.disabled {
                true => None,
                false => Some(conf.bind_addr.unwrap_or(DEFAULT_METRICS_ADDR)),
            },
        }
    }
}
