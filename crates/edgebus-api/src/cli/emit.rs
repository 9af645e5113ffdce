//! `edgebus emit`: a command-line client bus.
//!
//! Emits events on a [`ClientMessageBus`] backed by a [`BeaconSink`], prints
//! each event as local listeners see it, then flushes explicitly and waits
//! for the beacon, the way a page does on unload.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use edgebus_core::{BusOptions, ClientDispatch, ClientMessageBus, ClientMessageEvent, Listener};
use edgebus_infra::sink::BeaconSink;
use edgebus_types::config::EdgebusConfig;
use edgebus_types::cookies::ReadonlyCookies;
use edgebus_types::visitor::Visitor;

#[derive(Debug, Args)]
pub struct EmitArgs {
    /// Event type (e.g. `Commerce.Cart.CHECKOUT_STARTED`).
    pub event_type: String,

    /// JSON payload.
    #[arg(default_value = "{}")]
    pub data: String,

    /// Emit the event this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Cookie header to identify the visitor from (`a=1; Edgebus-Session=...`).
    #[arg(long)]
    pub cookie: Option<String>,

    /// Visitor id; takes precedence over `--cookie`.
    #[arg(long)]
    pub visitor: Option<String>,

    /// Beacon URL (overrides `client.beacon_url`).
    #[arg(long)]
    pub url: Option<String>,
}

/// Resolve the visitor for this client from the flags.
fn resolve_visitor(args: &EmitArgs, session_cookie: &str) -> Visitor {
    if let Some(id) = &args.visitor {
        return Visitor::new(id.clone());
    }
    let cookies = args
        .cookie
        .as_deref()
        .map(ReadonlyCookies::parse)
        .unwrap_or_default();
    ClientDispatch::from_cookies(&cookies, session_cookie)
        .visitor()
        .clone()
}

/// Listener echoing every dispatched event to stdout.
fn echo_listener(json: bool, quiet: bool) -> Listener<ClientMessageEvent> {
    Listener::new(move |event: &ClientMessageEvent| {
        if quiet {
            return Ok(());
        }
        if json {
            let line = serde_json::json!({
                "dispatched": event.message(),
                "visitor": event.visitor().id,
            });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!(
                "  {} {} {}",
                style("→").cyan(),
                style(event.message().event_type()).bold(),
                style(event.message().data()).dim()
            );
        }
        Ok(())
    })
}

pub async fn run(config: &EdgebusConfig, args: EmitArgs, json: bool, quiet: bool) -> Result<()> {
    let data: serde_json::Value = serde_json::from_str(&args.data)
        .with_context(|| format!("payload is not valid JSON: {}", args.data))?;

    let url = args
        .url
        .clone()
        .unwrap_or_else(|| config.client.beacon_url.clone());
    let sink = BeaconSink::new(url).context("failed to create beacon sink")?;
    let visitor = resolve_visitor(&args, &config.client.session_cookie);

    let bus = ClientMessageBus::client(visitor, sink.clone(), BusOptions::from(&config.bus));
    bus.on(args.event_type.clone(), echo_listener(json, quiet));

    for _ in 0..args.repeat {
        bus.emit(args.event_type.clone(), data.clone());
    }
    let emitted = args.repeat as usize;

    // Page-unload analogue: hand everything to the beacon now.
    bus.flush_to_external();
    let drained = sink.drain(config.client.drain_timeout()).await;
    if !drained {
        tracing::warn!(in_flight = sink.in_flight(), "beacons still in flight at exit");
    }

    if json {
        let summary = serde_json::json!({
            "emitted": emitted,
            "beacon_url": sink.url(),
            "visitor": bus.visitor().id,
            "drained": drained,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        let mark = if drained {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!();
        println!(
            "  {} {} event(s) beaconed to {}",
            mark,
            emitted,
            style(sink.url()).cyan()
        );
        if !bus.visitor().is_anonymous() {
            println!("  {}", style(format!("visitor: {}", bus.visitor().id)).dim());
        }
        println!();
    }

    Ok(())
}
