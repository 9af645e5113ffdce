//! Shared domain types for edgebus.
//!
//! This crate contains the types that flow between producers, the bus, and
//! delivery sinks: event records and their wire format, visitor identity,
//! request cookies, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod cookies;
pub mod error;
pub mod event;
pub mod visitor;
