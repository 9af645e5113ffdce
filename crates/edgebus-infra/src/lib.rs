//! Infrastructure layer for edgebus.
//!
//! Contains the [`DeliverySink`](edgebus_core::DeliverySink) implementations
//! (beacon for clients; warehouse, SQLite and log for the edge) and the
//! data-directory and `config.toml` loading shared by every binary.

pub mod config;
pub mod sink;
