//! # Hosted services.
//!
//! Background components started and stopped together with a
//! [`GenericHost`](crate::GenericHost).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;

/// A component whose lifetime is bound to the host.
///
/// Start order is registration order; stop and dispose run in reverse.
#[async_trait]
pub trait HostedService: Send + Sync + 'static {
    /// Returns the service name used in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Starts the service. `ctx` is the caller's token for the start phase only.
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError>;

    /// Stops the service.
    async fn stop(&self) -> Result<(), BoxError>;

    /// Gives back resources after the host has stopped.
    async fn dispose(&self) {}
}
