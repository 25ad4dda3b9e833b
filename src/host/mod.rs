//! # Host contracts and the generic host.
//!
//! The invoker drives a host through `build → start → stop → dispose` and
//! needs nothing else from it than the [`Host`] and [`BuildHost`] traits:
//!
//! | Contract                | Method                                   |
//! |-------------------------|------------------------------------------|
//! | build                   | [`BuildHost::build`]                     |
//! | start / stop            | [`Host::start`], [`Host::stop`]          |
//! | service lookup          | [`Host::registry`] → [`Registry`]        |
//! | shutdown signal         | [`Host::shutting_down`]                  |
//! | disposal                | [`Host::disposal`] + `dispose(_async)`   |
//!
//! [`GenericHost`] / [`HostBuilder`] implement these contracts with a
//! [`ServiceRegistry`], a [`Lifetime`] and optional [`HostedService`]s.

mod generic;
mod lifetime;
mod registry;
mod service;
mod signals;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HostError;
use crate::release::Release;

pub use generic::{GenericHost, HostBuilder};
pub use lifetime::Lifetime;
pub use registry::{Registration, Registry, Service, ServiceRegistry};
pub use service::HostedService;
pub use signals::wait_for_shutdown_signal;

/// A long-lived application host.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Services available to commands and factories.
    fn registry(&self) -> &dyn Registry;

    /// Token cancelled once the host begins shutting down.
    fn shutting_down(&self) -> CancellationToken;

    /// Starts the host. Must fail with [`HostError::Canceled`] if `ctx` is cancelled.
    async fn start(&self, ctx: CancellationToken) -> Result<(), HostError>;

    /// Stops the host.
    async fn stop(&self) -> Result<(), HostError>;

    /// Declares which disposal hook to call; [`Release::Async`] is preferred when both exist.
    fn disposal(&self) -> Release {
        Release::None
    }

    /// Synchronous disposal, used for [`Release::Sync`].
    fn dispose(&self) {}

    /// Asynchronous disposal, used for [`Release::Async`].
    async fn dispose_async(&self) {}
}

/// Produces a fresh host per invocation.
pub trait BuildHost: Send + Sync {
    /// Host type produced.
    type Host: Host;

    /// Builds a new, not yet started host.
    fn build(&self) -> Result<Self::Host, HostError>;
}
