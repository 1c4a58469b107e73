use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use handoff_cli::Config;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log filter variable checked before `RUST_LOG`.
const LOG_ENV: &str = "HANDOFF_LOG";

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(LOG_ENV)
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let explicit = config_path.is_some();
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/handoff.yaml > ~/.config/handoff/config.yaml
            let local_config = PathBuf::from("config/handoff.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("handoff");
                path.push("config.yaml");
                path
            }
        }
    };

    let mut config = if config_path.exists() {
        let config = Config::load_file(&config_path)
            .await
            .context("Failed to load config file")?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else if explicit {
        bail!("Config file not found: {}", config_path.display());
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Config::default()
    };

    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}
