//! Delivery sink implementations.
//!
//! - [`BeaconSink`]: client side, posts batches to the edge ingest endpoint.
//! - [`WarehouseSink`], [`SqliteSink`], [`LogSink`]: edge side, the durable
//!   write at the end of a request. Selected by [`build_edge_sink`].

pub mod beacon;
pub mod log;
pub mod sqlite;
pub mod warehouse;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use edgebus_core::DeliverySink;
use edgebus_types::config::SinkConfig;
use edgebus_types::error::DeliveryError;

pub use beacon::BeaconSink;
pub use log::LogSink;
pub use sqlite::SqliteSink;
pub use warehouse::WarehouseSink;

/// Environment variable consulted when the warehouse token is not in the
/// config file.
pub const WAREHOUSE_TOKEN_ENV: &str = "EDGEBUS_WAREHOUSE_TOKEN";

/// Default SQLite file name inside the data directory.
pub const DEFAULT_EVENTS_DB: &str = "events.db";

/// Build the process-wide edge sink described by `config`.
pub async fn build_edge_sink(config: &SinkConfig, data_dir: &Path) -> Result<Arc<dyn DeliverySink>, DeliveryError> {
    let sink: Arc<dyn DeliverySink> = match config {
        SinkConfig::Log => Arc::new(LogSink::new()),
        SinkConfig::Warehouse {
            url,
            token,
            timeout_ms,
        } => {
            let token = token
                .clone()
                .or_else(|| std::env::var(WAREHOUSE_TOKEN_ENV).ok())
                .map(SecretString::from);
            Arc::new(WarehouseSink::new(
                url.clone(),
                token,
                Duration::from_millis(*timeout_ms),
            )?)
        }
        SinkConfig::Sqlite { path } => {
            let path = match path {
                Some(path) => Path::new(path).to_path_buf(),
                None => data_dir.join(DEFAULT_EVENTS_DB),
            };
            Arc::new(SqliteSink::open_path(&path).await?)
        }
    };

    tracing::info!(sink = sink.name(), "edge delivery sink ready");
    Ok(sink)
}
