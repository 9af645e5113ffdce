//! Configuration loader for edgebus.
//!
//! Reads `config.toml` from the data directory (`~/.edgebus/` in production)
//! or from an explicit path, and deserializes it into [`EdgebusConfig`].

use std::path::{Path, PathBuf};

use edgebus_types::config::EdgebusConfig;
use edgebus_types::error::ConfigError;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EDGEBUS_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `EDGEBUS_DATA_DIR` environment variable
/// 2. `~/.edgebus`
/// 3. `.edgebus` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".edgebus");
    }

    PathBuf::from(".edgebus")
}

/// Path of `config.toml` inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration from `path`.
///
/// - Missing file: returns [`EdgebusConfig::default()`].
/// - Unreadable or malformed file: returns an error; there is no fallback.
pub async fn load_config(path: &Path) -> Result<EdgebusConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return Ok(EdgebusConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };

    toml::from_str::<EdgebusConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Load from an explicit `--config` path, or from the data directory.
pub async fn load_config_or_default(explicit: Option<&Path>, data_dir: &Path) -> Result<EdgebusConfig, ConfigError> {
    match explicit {
        Some(path) => load_config(path).await,
        None => load_config(&config_path(data_dir)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgebus_types::config::SinkConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&config_path(tmp.path())).await.unwrap();
        assert_eq!(config.bus.throttle_delay_ms, 1000);
        assert_eq!(config.edge.sink, SinkConfig::Log);
    }

    #[tokio::test]
    async fn valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = config_path(tmp.path());
        tokio::fs::write(
            &path,
            r#"
[bus]
throttle_delay_ms = 50

[edge.sink]
kind = "sqlite"
path = "/var/lib/edgebus/events.db"
"#,
        )
        .await
        .unwrap();

        let config = load_config_or_default(None, tmp.path()).await.unwrap();
        assert_eq!(config.bus.throttle_delay_ms, 50);
        assert_eq!(
            config.edge.sink,
            SinkConfig::Sqlite {
                path: Some("/var/lib/edgebus/events.db".to_string())
            }
        );
    }

    #[tokio::test]
    async fn invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_config_or_default(Some(path.as_path()), tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-edgebus");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-edgebus"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
