//! `edgebus config`: print the effective configuration.

use std::path::Path;

use anyhow::Result;
use console::style;

use edgebus_types::config::{EdgebusConfig, SinkConfig};

fn describe_sink(sink: &SinkConfig) -> String {
    match sink {
        SinkConfig::Log => "log".to_string(),
        SinkConfig::Warehouse { url, token, .. } => {
            let auth = if token.is_some() { "token set" } else { "no token" };
            format!("warehouse ({url}, {auth})")
        }
        SinkConfig::Sqlite { path: Some(path) } => format!("sqlite ({path})"),
        SinkConfig::Sqlite { path: None } => "sqlite (data dir)".to_string(),
    }
}

pub fn show(config: &EdgebusConfig, data_dir: &Path, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let row = |label: &str, value: String| {
        println!("  {:<20} {}", style(label).dim(), value);
    };

    println!();
    println!(
        "  {} edgebus v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    row("data dir", data_dir.display().to_string());
    row("throttle delay", format!("{} ms", config.bus.throttle_delay_ms));
    row("debug", config.bus.debug.to_string());
    println!();
    row("beacon url", config.client.beacon_url.clone());
    row("drain timeout", format!("{} ms", config.client.drain_timeout_ms));
    row("client cookie", config.client.session_cookie.clone());
    println!();
    row(
        "edge listen",
        format!("{}:{}", config.edge.host, config.edge.port),
    );
    row("ingest path", config.edge.ingest_path.clone());
    row("edge cookie", config.edge.session_cookie.clone());
    row("edge sink", describe_sink(&config.edge.sink));
    if !config.edge.log_event_types.is_empty() {
        row("logged types", config.edge.log_event_types.join(", "));
    }
    println!();

    Ok(())
}
