use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use item_catalog::{config::Config, server::run_with_config_until_ctrl_c};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(about = "Serve the item catalog")]
struct Cli {
    /// Path to config file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// HTTP port, overrides the config file
    #[clap(short, long)]
    port: Option<u16>,
}

impl Cli {
    async fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                debug!("loading config from {:?}", path);
                Config::load(path).await?
            }
            None => {
                debug!("using default config");
                Config::default()
            }
        };
        if let Some(port) = self.port {
            config.http.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let config = Cli::parse().load_config().await?;
    run_with_config_until_ctrl_c(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn port_flag_overrides_config() -> Result<()> {
        let config = Cli::try_parse_from(["item-catalog", "--port", "9001"])?
            .load_config()
            .await?;
        assert_eq!(config.http.port, 9001);

        let dev_config = concat!(env!("CARGO_MANIFEST_DIR"), "/config.dev.toml");
        let config = Cli::try_parse_from(["item-catalog", "-c", dev_config])?
            .load_config()
            .await?;
        assert_eq!(config.http.port, 8000);
        Ok(())
    }
}
