//! edgebus CLI and edge server entry point.
//!
//! Binary name: `edgebus`
//!
//! Parses CLI arguments, loads configuration, then either starts the edge
//! ingest server or runs a client-side command.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use edgebus_observe::TracingOptions;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    edgebus_observe::init_tracing(&TracingOptions {
        default_filter: cli.log_filter().to_string(),
        json: cli.log_json,
        otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "edgebus", &mut std::io::stdout());
        return Ok(());
    }

    let (config, data_dir) = state::load_config(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Serve { port, host, .. } => {
            let mut config = config;
            if let Some(port) = port {
                config.edge.port = port;
            }
            if let Some(host) = host {
                config.edge.host = host;
            }
            serve(config, data_dir, cli.quiet).await
        }

        Commands::Emit(args) => cli::emit::run(&config, args, cli.json, cli.quiet).await,

        Commands::Config => cli::config::show(&config, &data_dir, cli.json),

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    edgebus_observe::shutdown_tracing();
    result
}

async fn serve(
    config: edgebus_types::config::EdgebusConfig,
    data_dir: std::path::PathBuf,
    quiet: bool,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.edge.host, config.edge.port);
    let state = AppState::init(config, data_dir).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} edgebus edge listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}{}", state.config.edge.ingest_path)).cyan()
        );
        println!(
            "  {} {}",
            console::style("sink:").dim(),
            state.sink.name()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
