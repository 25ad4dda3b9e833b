//! # Demo: invoke
//!
//! Runs a resource-owning command inside a generic host with one hosted
//! service, then a failing closure under both outcome policies.
//!
//! Demonstrates how to:
//! - Register services and a [`HostedService`] with [`HostBuilder`].
//! - Resolve a [`Command`] through [`Activate`].
//! - Render lifecycle events with the built-in [`LogWriter`].
//! - Switch between swallowing and re-raising failures with [`Options`].
//!
//! ## Flow
//! ```text
//! Invoker::invoke::<Export>()
//!     ├─► host.start()            (Heartbeat::start)
//!     ├─► Export::invoke(linked)  (Ctrl-C stops the host and cancels it)
//!     ├─► host.stop()             (Heartbeat::stop)
//!     ├─► Export::release()
//!     └─► host.dispose_async()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example invoke
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hostvisor::{
    Activate, BoxError, Command, Config, HostBuilder, HostedService, Invoker, Lifetime, LogWriter,
    Options, Registry, Release, ResolutionError, Subscribe, WorkError,
};

struct Heartbeat;

#[async_trait]
impl HostedService for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }

    async fn start(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        tracing::info!("heartbeat online");
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        tracing::info!("heartbeat offline");
        Ok(())
    }
}

struct Settings {
    batches: u32,
}

struct Export {
    settings: Arc<Settings>,
    lifetime: Arc<Lifetime>,
}

#[async_trait]
impl Command for Export {
    fn name(&self) -> &str {
        "export"
    }

    async fn invoke(&self, ctx: CancellationToken) -> Result<(), WorkError> {
        for batch in 1..=self.settings.batches {
            tokio::select! {
                _ = ctx.cancelled() => return Err(WorkError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
            tracing::info!(batch, "batch exported");
        }
        if self.lifetime.is_stopping() {
            return Err(WorkError::Canceled);
        }
        Ok(())
    }

    fn release_kind(&self) -> Release {
        Release::Sync
    }

    fn release(&self) {
        tracing::info!("export file closed");
    }
}

impl Activate for Export {
    fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError> {
        Ok(Self {
            settings: registry.resolve::<Settings>()?,
            lifetime: registry.resolve::<Lifetime>()?,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let host = HostBuilder::new()
        .configure_services(|s| {
            s.add_singleton(Settings { batches: 3 });
        })
        .with_hosted_service(Arc::new(Heartbeat))
        .with_os_signals();

    // 1. Resource-owning command, resolved by activation.
    let invoker = Invoker::builder(Config::default())
        .with_subscribers(subs.clone())
        .build(host.clone());
    invoker.invoke::<Export>(CancellationToken::new()).await?;

    // 2. A failing closure is logged and swallowed by default...
    let fails = |_ctx: CancellationToken| async {
        Err::<(), _>(WorkError::fail(std::io::Error::other("remote refused")))
    };
    invoker
        .invoke_fn("upload", fails, CancellationToken::new())
        .await?;

    // 3. ...and re-raised once the host registers throwing options.
    let strict = Invoker::builder(Config::default())
        .with_subscribers(subs)
        .build(host.configure_services(|s| {
            s.add_singleton(Options::throwing());
        }));
    if let Err(err) = strict
        .invoke_fn("upload", fails, CancellationToken::new())
        .await
    {
        tracing::warn!(label = err.as_label(), error = %err, "upload re-raised");
    }

    invoker.shutdown().await;
    strict.shutdown().await;
    Ok(())
}
