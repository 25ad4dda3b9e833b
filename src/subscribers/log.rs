//! # LogWriter: renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into a `tracing` record at
//! [`Event::level`]. Install any `tracing` subscriber to see the output.
//!
//! ## Example output
//! ```text
//! DEBUG hostvisor: [host-starting]
//! INFO  hostvisor: [command-starting] command="import"
//! WARN  hostvisor: [command-failed] command="import" reason="boom"
//! INFO  hostvisor: [failure-suppressed] command="import" boom
//! DEBUG hostvisor: [host-disposed]
//! ```

use async_trait::async_trait;
use tracing::Level;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::HostStarting => "host-starting",
        EventKind::HostStarted => "host-started",
        EventKind::HostStartFailed => "host-start-failed",
        EventKind::HostStopping => "host-stopping",
        EventKind::HostStopped => "host-stopped",
        EventKind::HostStopFailed => "host-stop-failed",
        EventKind::HostDisposed => "host-disposed",
        EventKind::ShutdownRequested => "shutdown-requested",
        EventKind::ResolutionFailed => "resolution-failed",
        EventKind::CommandStarting => "command-starting",
        EventKind::CommandCompleted => "command-completed",
        EventKind::CommandCanceled => "command-canceled",
        EventKind::CommandFailed => "command-failed",
        EventKind::CommandReleased => "command-released",
        EventKind::FailureSuppressed => "failure-suppressed",
        EventKind::SubscriberPanicked => "subscriber-panicked",
        EventKind::SubscriberOverflow => "subscriber-overflow",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tag = tag(e.kind);
        let command = e.command.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.level() {
            Level::ERROR => {
                tracing::error!(seq = e.seq, "[{tag}] command={command:?} err={reason:?}")
            }
            Level::WARN => {
                tracing::warn!(seq = e.seq, "[{tag}] command={command:?} reason={reason:?}")
            }
            Level::INFO => tracing::info!(seq = e.seq, "[{tag}] command={command:?} {reason}"),
            _ => tracing::debug!(seq = e.seq, "[{tag}]"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
