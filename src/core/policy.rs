//! # Outcome classification and handling.
//!
//! Every invocation produces exactly one [`Outcome`], which is handed to
//! [`OutcomePolicy::resolve`] after the host has been disposed.
//!
//! | Outcome               | Log level | Result                                        |
//! |-----------------------|-----------|-----------------------------------------------|
//! | `Completed`           | none      | `Ok(())`                                      |
//! | `CancelledByShutdown` | info      | `Ok(())`                                      |
//! | `CancelledByCaller`   | none      | `Err(InvokeError::Canceled)`                  |
//! | `Failed(e)`           | error     | `Err(Failed(e))` if `throw_exception`, else `Ok(())` |
//!
//! A swallowed failure additionally publishes `FailureSuppressed`.

use crate::config::Options;
use crate::error::{BoxError, InvokeError};
use crate::events::{Bus, Event, EventKind};

/// Result of running a command once.
#[derive(Debug)]
pub enum Outcome {
    /// The command returned normally.
    Completed,
    /// The caller's token was cancelled.
    CancelledByCaller,
    /// The host shut down while the command was running.
    CancelledByShutdown,
    /// The command (or host start) failed.
    Failed(BoxError),
}

impl Outcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::CancelledByCaller => "cancelled_by_caller",
            Outcome::CancelledByShutdown => "cancelled_by_shutdown",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Decides what the caller sees for an [`Outcome`].
#[derive(Clone, Copy, Debug)]
pub struct OutcomePolicy {
    options: Options,
}

impl OutcomePolicy {
    /// Creates a policy driven by `options`.
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Logs the outcome and maps it onto the caller-visible result.
    pub fn resolve(self, outcome: Outcome, command: &str, bus: &Bus) -> Result<(), InvokeError> {
        match outcome {
            Outcome::Completed => Ok(()),
            Outcome::CancelledByShutdown => {
                tracing::info!(command, "command cancelled by host shutdown");
                Ok(())
            }
            Outcome::CancelledByCaller => Err(InvokeError::Canceled),
            Outcome::Failed(err) => {
                tracing::error!(command, error = %err, "command failed");
                if self.options.throw_exception {
                    return Err(InvokeError::Failed(err));
                }
                bus.publish(
                    Event::new(EventKind::FailureSuppressed)
                        .with_command(command)
                        .with_reason(err.to_string()),
                );
                Ok(())
            }
        }
    }
}
