//! # hostvisor
//!
//! **Hostvisor** runs a single unit of work (a *command*) inside the
//! start/stop envelope of a long-lived application host.
//!
//! It guarantees that:
//! - the caller's cancellation token and the host's shutdown signal are merged
//!   into **one** token handed to the command;
//! - the command's resources are released on **every** exit path, after the
//!   host has stopped and before it is disposed;
//! - failures are classified and either surfaced, logged or swallowed according
//!   to an explicit [`Options`] policy.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   invoke::<T>()      invoke_fn(closure)      invoke_with(factory)
//!        │                    │                        │
//!        └────────────────────┼────────────────────────┘
//!                             ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Invoker (lifecycle orchestrator)                                 │
//! │  - BuildHost (fresh host per call)                                │
//! │  - ResourceScope (owns the command, releases it exactly once)     │
//! │  - LinkedToken (caller token + host shutdown token)               │
//! │  - OutcomePolicy (log / rethrow / suppress)                       │
//! └──────┬─────────────────────────────────────────────────────┬──────┘
//!        │ publishes                                           │
//!        │ - HostStarting / HostStarted / HostStopping / ...   │
//!        │ - CommandStarting / CommandCompleted / ...          │
//!        ▼                                                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                     (capacity: Config::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      LogWriter  sub2 ...  subN
//! ```
//!
//! ### Lifecycle
//! ```text
//! build ─► acquire ─► start ─► run_once ─► stop ─► release ─► dispose ─► OutcomePolicy
//!
//! Outcome               │ default options      │ throw_exception = true
//! ──────────────────────┼──────────────────────┼───────────────────────
//! Completed             │ Ok(())               │ Ok(())
//! CancelledByShutdown   │ Ok(()) + info log    │ Ok(()) + info log
//! CancelledByCaller     │ Err(Canceled)        │ Err(Canceled)
//! Failed(e)             │ Ok(()) + error log   │ Err(Failed(e)) + error log
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------|---------------------------------------------|
//! | **Invocation**    | Run one command inside a host's lifecycle.                  | [`Invoker`], [`InvokerBuilder`]             |
//! | **Commands**      | Define work as types or closures, with release hooks.       | [`Command`], [`CommandFn`], [`Activate`]    |
//! | **Hosting**       | Host contracts plus a generic host with hosted services.    | [`Host`], [`BuildHost`], [`HostBuilder`]    |
//! | **Services**      | Type-keyed singleton, scoped and transient registrations.   | [`Registry`], [`ServiceRegistry`]           |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).      | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for invocation, commands and hosts.            | [`InvokeError`], [`WorkError`], [`HostError`] |
//! | **Configuration** | Flavor and per-invocation options.                          | [`Config`], [`Options`], [`Flavor`]         |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Config, HostBuilder, Invoker, LogWriter, Options, Subscribe, WorkError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), hostvisor::InvokeError> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!
//!     let invoker = Invoker::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build(HostBuilder::new().configure_services(|s| {
//!             s.add_singleton(Options::throwing());
//!         }));
//!
//!     invoker
//!         .invoke_fn("hello", |ctx: CancellationToken| async move {
//!             tokio::select! {
//!                 _ = ctx.cancelled() => Err(WorkError::Canceled),
//!                 _ = tokio::time::sleep(Duration::from_millis(10)) => Ok(()),
//!             }
//!         }, CancellationToken::new())
//!         .await?;
//!
//!     invoker.shutdown().await;
//!     Ok(())
//! }
//! ```
mod command;
mod config;
mod core;
mod error;
mod events;
mod host;
mod release;
mod subscribers;

// ---- Public re-exports ----

pub use command::{Activate, Command, CommandFn, CommandRef};
pub use config::{Config, Flavor, Options};
pub use crate::core::{
    Invoker, InvokerBuilder, LinkedToken, Outcome, OutcomePolicy, ResourceScope, run_once,
};
pub use error::{BoxError, HostError, InvokeError, ResolutionError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use host::{
    BuildHost, GenericHost, Host, HostBuilder, HostedService, Lifetime, Registration, Registry,
    Service, ServiceRegistry, wait_for_shutdown_signal,
};
pub use release::Release;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
