//! # InvokerBuilder: assembles an [`Invoker`] from a config, subscribers and a host builder.

use std::sync::Arc;

use crate::{
    config::Config,
    core::invoker::Invoker,
    events::Bus,
    host::BuildHost,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Invoker`] with optional subscribers.
pub struct InvokerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl InvokerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (host lifecycle, command outcome, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the invoker around `host_builder`.
    ///
    /// Must be called from within a Tokio runtime when subscribers are set.
    pub fn build<B: BuildHost>(self, host_builder: B) -> Invoker<B> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        Invoker::new_internal(self.cfg, host_builder, bus, subs)
    }
}
