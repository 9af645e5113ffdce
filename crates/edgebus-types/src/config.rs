//! Configuration types for edgebus.
//!
//! `EdgebusConfig` represents the top-level `config.toml` shared by the edge
//! server and the client CLI. All fields have sensible defaults, so an empty
//! or missing file yields a working local setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between the first emit of a batch and its automatic flush.
pub const DEFAULT_THROTTLE_DELAY_MS: u64 = 1000;

/// Default path the edge accepts beacons on.
pub const DEFAULT_INGEST_PATH: &str = "/.edgebus/message-bus";

/// Default name of the cookie carrying the visitor id.
pub const DEFAULT_SESSION_COOKIE: &str = "Edgebus-Session";

/// Top-level configuration.
///
/// Loaded from `~/.edgebus/config.toml` (or `$EDGEBUS_DATA_DIR/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgebusConfig {
    /// Bus timing and diagnostics.
    #[serde(default)]
    pub bus: BusConfig,

    /// Client-side (beacon) settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Edge server settings.
    #[serde(default)]
    pub edge: EdgeConfig,
}

/// Settings applied to every bus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Throttle window in milliseconds.
    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,

    /// Log every emit and flush at debug level.
    #[serde(default)]
    pub debug: bool,
}

impl BusConfig {
    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay_ms)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            throttle_delay_ms: default_throttle_delay_ms(),
            debug: false,
        }
    }
}

/// Settings for the client-side bus and its beacon sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL beacons are posted to.
    #[serde(default = "default_beacon_url")]
    pub beacon_url: String,

    /// How long teardown waits for in-flight beacons, in milliseconds.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Cookie the visitor id is read from.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl ClientConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            beacon_url: default_beacon_url(),
            drain_timeout_ms: default_drain_timeout_ms(),
            session_cookie: default_session_cookie(),
        }
    }
}

/// Settings for the edge ingest server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path beacons are accepted on.
    #[serde(default = "default_ingest_path")]
    pub ingest_path: String,

    /// Cookie the visitor id is read from.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Event types the edge logs as they are dispatched.
    #[serde(default)]
    pub log_event_types: Vec<String>,

    /// Where flushed batches are written.
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ingest_path: default_ingest_path(),
            session_cookie: default_session_cookie(),
            log_event_types: Vec::new(),
            sink: SinkConfig::default(),
        }
    }
}

/// Durable destination for batches flushed at the edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Log each batch; nothing is persisted.
    #[default]
    Log,

    /// POST each batch to an analytics write API.
    Warehouse {
        url: String,
        /// Bearer token; never serialized back out.
        #[serde(default, skip_serializing)]
        token: Option<String>,
        #[serde(default = "default_warehouse_timeout_ms")]
        timeout_ms: u64,
    },

    /// Append each batch to a SQLite database.
    Sqlite {
        /// Database file; defaults to `events.db` in the data directory.
        #[serde(default)]
        path: Option<String>,
    },
}

fn default_throttle_delay_ms() -> u64 {
    DEFAULT_THROTTLE_DELAY_MS
}

fn default_beacon_url() -> String {
    format!("http://{}:{}{}", default_host(), default_port(), DEFAULT_INGEST_PATH)
}

fn default_drain_timeout_ms() -> u64 {
    2_000
}

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_ingest_path() -> String {
    DEFAULT_INGEST_PATH.to_string()
}

fn default_warehouse_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EdgebusConfig::default();
        assert_eq!(config.bus.throttle_delay(), Duration::from_millis(1000));
        assert!(!config.bus.debug);
        assert_eq!(
            config.client.beacon_url,
            "http://127.0.0.1:8787/.edgebus/message-bus"
        );
        assert_eq!(config.client.session_cookie, "Edgebus-Session");
        assert_eq!(config.edge.port, 8787);
        assert_eq!(config.edge.ingest_path, DEFAULT_INGEST_PATH);
        assert_eq!(config.edge.sink, SinkConfig::Log);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: EdgebusConfig = toml::from_str("").unwrap();
        assert_eq!(config.bus.throttle_delay_ms, 1000);
        assert!(config.edge.log_event_types.is_empty());
        assert_eq!(config.edge.sink, SinkConfig::Log);
    }

    #[test]
    fn test_deserialize_with_values() {
        let toml_str = r#"
[bus]
throttle_delay_ms = 250
debug = true

[client]
beacon_url = "https://shop.example/.edgebus/message-bus"

[edge]
port = 9000
log_event_types = ["Commerce.Cart.CHECKOUT_STARTED"]

[edge.sink]
kind = "warehouse"
url = "https://warehouse.example/v1/write"
token = "s3cret"
"#;
        let config: EdgebusConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bus.throttle_delay(), Duration::from_millis(250));
        assert!(config.bus.debug);
        assert_eq!(config.client.drain_timeout_ms, 2_000);
        assert_eq!(config.edge.port, 9000);
        assert_eq!(config.edge.host, "127.0.0.1");
        assert_eq!(config.edge.log_event_types.len(), 1);
        match config.edge.sink {
            SinkConfig::Warehouse {
                url,
                token,
                timeout_ms,
            } => {
                assert_eq!(url, "https://warehouse.example/v1/write");
                assert_eq!(token.as_deref(), Some("s3cret"));
                assert_eq!(timeout_ms, 10_000);
            }
            other => panic!("unexpected sink: {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_sink_without_path() {
        let config: EdgebusConfig = toml::from_str("[edge.sink]\nkind = \"sqlite\"\n").unwrap();
        assert_eq!(config.edge.sink, SinkConfig::Sqlite { path: None });
    }

    #[test]
    fn test_warehouse_token_is_not_serialized() {
        let sink = SinkConfig::Warehouse {
            url: "https://warehouse.example".to_string(),
            token: Some("s3cret".to_string()),
            timeout_ms: 500,
        };
        let json = serde_json::to_string(&sink).unwrap();
        assert!(json.contains("\"kind\":\"warehouse\""));
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_unknown_sink_kind_is_rejected() {
        let result: Result<EdgebusConfig, _> = toml::from_str("[edge.sink]\nkind = \"kafka\"\n");
        assert!(result.is_err());
    }
}
