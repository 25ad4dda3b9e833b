//! # Application lifetime.
//!
//! [`Lifetime`] is the host's shutdown signal. Every
//! [`GenericHost`](crate::GenericHost) registers its own instance, so services
//! and commands can resolve it and either observe or request shutdown.
//!
//! ```text
//! stop_application() ──► stopping token cancelled ──► linked command token cancelled
//! host.stop() done   ──► stopped token cancelled
//! ```

use tokio_util::sync::CancellationToken;

/// Shutdown notifications of one host instance.
#[derive(Clone, Debug, Default)]
pub struct Lifetime {
    stopping: CancellationToken,
    stopped: CancellationToken,
}

impl Lifetime {
    /// Creates a lifetime with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled once shutdown begins.
    pub fn stopping(&self) -> CancellationToken {
        self.stopping.clone()
    }

    /// Token cancelled once the host has finished stopping.
    pub fn stopped(&self) -> CancellationToken {
        self.stopped.clone()
    }

    /// Requests a graceful shutdown of the host. Idempotent.
    pub fn stop_application(&self) {
        self.stopping.cancel();
    }

    /// True once shutdown has been requested.
    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    pub(crate) fn notify_stopped(&self) {
        self.stopped.cancel();
    }
}
