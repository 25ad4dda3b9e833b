//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the invoker, the runner and the
//! outcome policy.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Invoker`, `runner::run_once`, `OutcomePolicy`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the invoker's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
