use std::sync::Arc;
use std::time::Duration;

use crate::core::{BusConfig, EventBus};

/// Builder for constructing an [`EventBus`] with non-default settings.
///
/// Starts from [`BusConfig::default`]; each option overrides one field.
#[derive(Debug, Clone, Default)]
pub struct EventBusBuilder {
    cfg: BusConfig,
}

impl EventBusBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: BusConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the per-subscription mailbox capacity (`0` = rendezvous).
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.cfg.mailbox_capacity = capacity;
        self
    }

    /// Sets the per-event handler timeout.
    ///
    /// `Duration::ZERO` turns the timeout off (handlers run unbounded); it is not an
    /// immediately expiring deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout = timeout;
        self
    }

    /// Enables or disables statistics recording.
    pub fn stats(mut self, enable: bool) -> Self {
        self.cfg.enable_stats = enable;
        self
    }

    /// Builds the bus, ready to be shared between publishers.
    pub fn build(self) -> Arc<EventBus> {
        Arc::new(EventBus::new(self.cfg))
    }
}
