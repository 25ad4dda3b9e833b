//! # Run the command once and classify the result.
//!
//! Executes one [`Command`] with the linked token and maps its result onto an
//! [`Outcome`], publishing lifecycle events to the [`Bus`].
//!
//! ## Classification
//! ```text
//! Ok(())                                   → Completed
//! Err(Canceled) and shutdown cancelled     → CancelledByShutdown
//! Err(Canceled) and shutdown not cancelled → CancelledByCaller
//! Err(Failed(e))                           → Failed(e)
//! panic                                    → Failed(WorkError::Panicked)
//! ```
//!
//! ## Rules
//! - The command cannot tell which source fired; the runner can, post-hoc,
//!   by checking the shutdown token.
//! - When both sources fired, shutdown wins (benign path).
//! - Always publishes **exactly one** terminal event:
//!   `CommandCompleted`, `CommandCanceled` or `CommandFailed`.

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    command::Command,
    core::policy::Outcome,
    error::WorkError,
    events::{Bus, Event, EventKind},
};

/// Runs `command` with `linked`, classifying cancellation against `shutdown`.
pub async fn run_once(
    command: &dyn Command,
    linked: &CancellationToken,
    shutdown: &CancellationToken,
    bus: &Bus,
) -> Outcome {
    let name = command.name();
    bus.publish(Event::new(EventKind::CommandStarting).with_command(name));

    let res = match std::panic::AssertUnwindSafe(command.invoke(linked.clone()))
        .catch_unwind()
        .await
    {
        Ok(res) => res,
        Err(panic_err) => {
            let message = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(WorkError::Panicked { message })
        }
    };

    match res {
        Ok(()) => {
            bus.publish(Event::new(EventKind::CommandCompleted).with_command(name));
            Outcome::Completed
        }
        Err(WorkError::Canceled) if shutdown.is_cancelled() => {
            bus.publish(Event::new(EventKind::ShutdownRequested));
            bus.publish(
                Event::new(EventKind::CommandCanceled)
                    .with_command(name)
                    .with_reason("shutdown"),
            );
            Outcome::CancelledByShutdown
        }
        Err(WorkError::Canceled) => {
            bus.publish(
                Event::new(EventKind::CommandCanceled)
                    .with_command(name)
                    .with_reason("caller"),
            );
            Outcome::CancelledByCaller
        }
        Err(WorkError::Failed(err)) => {
            bus.publish(
                Event::new(EventKind::CommandFailed)
                    .with_command(name)
                    .with_reason(err.to_string()),
            );
            Outcome::Failed(err)
        }
        Err(err @ WorkError::Panicked { .. }) => {
            bus.publish(
                Event::new(EventKind::CommandFailed)
                    .with_command(name)
                    .with_reason(err.to_string()),
            );
            Outcome::Failed(Box::new(err))
        }
    }
}
