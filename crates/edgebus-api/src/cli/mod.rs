//! CLI command definitions for the `edgebus` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the edge;
//! `emit` acts as a client producing events.

pub mod config;
pub mod emit;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Edge personalization message bus.
#[derive(Parser)]
#[command(name = "edgebus", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file to use instead of `config.toml` in the data directory.
    #[arg(long, global = true, env = "EDGEBUS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,edgebus=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the edge ingest server.
    Serve {
        /// Port to listen on (overrides `edge.port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides `edge.host`).
        #[arg(long)]
        host: Option<String>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Emit events from a client bus and beacon them to the edge.
    Emit(emit::EmitArgs),

    /// Print the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_maps_to_filter() {
        let cli = Cli::parse_from(["edgebus", "config"]);
        assert_eq!(cli.log_filter(), "warn");

        let cli = Cli::parse_from(["edgebus", "--quiet", "config"]);
        assert_eq!(cli.log_filter(), "error");

        let cli = Cli::parse_from(["edgebus", "-vv", "config"]);
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn serve_flags_are_optional_overrides() {
        let cli = Cli::parse_from(["edgebus", "serve", "--port", "9000", "--otel"]);
        match cli.command {
            Commands::Serve { port, host, otel } => {
                assert_eq!(port, Some(9000));
                assert_eq!(host, None);
                assert!(otel);
            }
            _ => panic!("expected serve"),
        }
    }
}
