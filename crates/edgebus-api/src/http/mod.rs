//! HTTP layer for the edge server.
//!
//! Accepts beacons on the configured ingest path and answers in the
//! envelope response format.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
