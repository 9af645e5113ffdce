//! Bus core: listener registry, pending batch, and throttle timer.
//!
//! A [`MessageBus`] fans each emitted record out to the listeners registered
//! for its type and, independently, appends it to a pending batch that is
//! flushed to the delivery sink when the throttle window closes or when
//! [`MessageBus::flush_to_external`] is called (owners call it on teardown).

mod listener;
mod message_bus;

use std::time::Duration;

use edgebus_types::config::BusConfig;

pub use listener::{Listener, ListenerId};
pub use message_bus::MessageBus;

/// Default throttle window between the first emit of a batch and its flush.
pub const DEFAULT_THROTTLE_DELAY: Duration =
    Duration::from_millis(edgebus_types::config::DEFAULT_THROTTLE_DELAY_MS);

/// Per-instance bus options.
#[derive(Debug, Clone)]
pub struct BusOptions {
    /// Delay between the first emit of a batch and the automatic flush.
    pub throttle_delay: Duration,
    /// Log every emit and flush at debug level.
    pub debug: bool,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            throttle_delay: DEFAULT_THROTTLE_DELAY,
            debug: false,
        }
    }
}

impl From<&BusConfig> for BusOptions {
    fn from(config: &BusConfig) -> Self {
        Self {
            throttle_delay: config.throttle_delay(),
            debug: config.debug,
        }
    }
}
