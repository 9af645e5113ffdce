//! Application state for the edge server.
//!
//! Holds the loaded configuration and the process-wide delivery sink that
//! every per-request bus writes to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};

use edgebus_core::{BusOptions, DeliverySink};
use edgebus_infra::config::{load_config_or_default, resolve_data_dir};
use edgebus_infra::sink::build_edge_sink;
use edgebus_types::config::EdgebusConfig;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EdgebusConfig>,
    pub data_dir: PathBuf,
    pub sink: Arc<dyn DeliverySink>,
}

impl AppState {
    /// Validate configuration and build the edge sink under `data_dir`.
    pub async fn init(config: EdgebusConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        if !config.edge.ingest_path.starts_with('/') {
            bail!(
                "edge.ingest_path must start with '/': {}",
                config.edge.ingest_path
            );
        }

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let sink = build_edge_sink(&config.edge.sink, &data_dir)
            .await
            .context("failed to initialize edge sink")?;

        Ok(Self::from_parts(config, data_dir, sink))
    }

    pub fn from_parts(config: EdgebusConfig, data_dir: PathBuf, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            config: Arc::new(config),
            data_dir,
            sink,
        }
    }

    /// Options for the per-request buses.
    pub fn bus_options(&self) -> BusOptions {
        BusOptions::from(&self.config.bus)
    }
}

/// Resolve the data directory and load configuration for any command.
pub async fn load_config(explicit: Option<&Path>) -> anyhow::Result<(EdgebusConfig, PathBuf)> {
    let data_dir = resolve_data_dir();
    let config = load_config_or_default(explicit, &data_dir).await?;
    Ok((config, data_dir))
}
