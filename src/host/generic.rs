//! # Generic host.
//!
//! [`HostBuilder`] collects service registrations and hosted services;
//! every [`BuildHost::build`] call produces an independent [`GenericHost`]
//! with its own [`Lifetime`], so concurrent invocations never share host state.
//!
//! ## Lifecycle
//! ```text
//! start(ctx):
//!   ├─ ctx cancelled?            → Err(Canceled)
//!   ├─ for svc in services       → svc.start(ctx)   (first error aborts)
//!   └─ with_os_signals           → spawn watcher → lifetime.stop_application()
//!
//! stop():
//!   ├─ lifetime.stop_application()
//!   ├─ abort signal watcher
//!   ├─ for svc in started.rev()  → svc.stop()       (all attempted, first error kept)
//!   └─ lifetime.notify_stopped()
//!
//! dispose_async():
//!   └─ for svc in services.rev() → svc.dispose()
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    BuildHost, Host, HostedService, Lifetime, Registry, ServiceRegistry, signals,
};
use crate::error::HostError;
use crate::release::Release;

/// Builder of [`GenericHost`] instances.
///
/// ## Example
/// ```rust
/// use hostvisor::{HostBuilder, Options};
///
/// let builder = HostBuilder::new()
///     .configure_services(|s| {
///         s.add_singleton(Options { throw_exception: true });
///     });
/// ```
#[derive(Clone, Default)]
pub struct HostBuilder {
    services: ServiceRegistry,
    hosted: Vec<Arc<dyn HostedService>>,
    os_signals: bool,
}

impl HostBuilder {
    /// Creates a builder with no services.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds service registrations.
    pub fn configure_services(mut self, configure: impl FnOnce(&mut ServiceRegistry)) -> Self {
        configure(&mut self.services);
        self
    }

    /// Adds a hosted service; services start in the order they are added.
    pub fn with_hosted_service(mut self, service: Arc<dyn HostedService>) -> Self {
        self.hosted.push(service);
        self
    }

    /// Requests application stop on SIGINT/SIGTERM/SIGQUIT (Ctrl-C on Windows) while running.
    pub fn with_os_signals(mut self) -> Self {
        self.os_signals = true;
        self
    }
}

impl BuildHost for HostBuilder {
    type Host = GenericHost;

    fn build(&self) -> Result<GenericHost, HostError> {
        let lifetime = Lifetime::new();
        let mut registry = self.services.clone();
        registry.add_singleton(lifetime.clone());

        Ok(GenericHost {
            registry,
            lifetime,
            services: self.hosted.clone(),
            os_signals: self.os_signals,
            started: Mutex::new(0),
            watcher: Mutex::new(None),
        })
    }
}

/// Host built by [`HostBuilder`].
pub struct GenericHost {
    registry: ServiceRegistry,
    lifetime: Lifetime,
    services: Vec<Arc<dyn HostedService>>,
    os_signals: bool,
    /// Number of services successfully started (prefix of `services`).
    started: Mutex<usize>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl GenericHost {
    /// The host's lifetime (also resolvable from the registry).
    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    fn abort_watcher(&self) {
        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(h) = handle {
            h.abort();
        }
    }
}

#[async_trait]
impl Host for GenericHost {
    fn registry(&self) -> &dyn Registry {
        &self.registry
    }

    fn shutting_down(&self) -> CancellationToken {
        self.lifetime.stopping()
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), HostError> {
        if ctx.is_cancelled() {
            return Err(HostError::Canceled);
        }

        for svc in &self.services {
            tokio::select! {
                res = svc.start(ctx.clone()) => {
                    res.map_err(|source| HostError::Start {
                        service: svc.name().to_string(),
                        source,
                    })?;
                }
                _ = ctx.cancelled() => return Err(HostError::Canceled),
            }
            *self.started.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        }

        if self.os_signals {
            let handle = signals::spawn_signal_watcher(self.lifetime.clone());
            *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }
        tracing::debug!(services = self.services.len(), "host started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), HostError> {
        self.lifetime.stop_application();
        self.abort_watcher();

        let started = {
            let mut guard = self.started.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        let mut first_err = None;
        for svc in self.services[..started].iter().rev() {
            if let Err(source) = svc.stop().await {
                tracing::warn!(
                    service = svc.name(),
                    error = %source,
                    "hosted service failed to stop"
                );
                first_err.get_or_insert(HostError::Stop {
                    service: svc.name().to_string(),
                    source,
                });
            }
        }

        self.lifetime.notify_stopped();
        tracing::debug!("host stopped");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn disposal(&self) -> Release {
        Release::Async
    }

    async fn dispose_async(&self) {
        self.abort_watcher();
        for svc in self.services.iter().rev() {
            svc.dispose().await;
        }
    }
}
