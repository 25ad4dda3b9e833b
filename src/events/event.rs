//! # Runtime events emitted during an invocation.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Host events**: start/stop/dispose of the host
//! - **Command events**: execution flow of the unit of work
//! - **Outcome events**: what the policy did with the result
//! - **Subscriber events**: delivery problems in the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! command name and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use hostvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CommandFailed)
//!     .with_command("import")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::CommandFailed);
//! assert_eq!(ev.command.as_deref(), Some("import"));
//! assert_eq!(ev.level(), tracing::Level::WARN);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use tracing::Level;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Host events ===
    /// Host start requested.
    HostStarting,
    /// Host started.
    HostStarted,
    /// Host start failed or was cancelled.
    ///
    /// Sets:
    /// - `reason`: error message
    HostStartFailed,
    /// Host stop requested.
    HostStopping,
    /// Host stopped.
    HostStopped,
    /// Host stop failed; the invocation outcome is kept.
    ///
    /// Sets:
    /// - `reason`: error message
    HostStopFailed,
    /// Host disposed. Always the last host event of an invocation.
    HostDisposed,
    /// The host began shutting down while the command was running.
    ShutdownRequested,

    // === Command events ===
    /// Resolving the command failed; nothing was started.
    ///
    /// Sets:
    /// - `reason`: resolution error
    ResolutionFailed,
    /// Command is about to run.
    ///
    /// Sets:
    /// - `command`: command name
    CommandStarting,
    /// Command returned normally.
    CommandCompleted,
    /// Command observed cancellation.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `reason`: `"shutdown"` or `"caller"`
    CommandCanceled,
    /// Command returned an error.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `reason`: error message
    CommandFailed,
    /// Command instance released.
    CommandReleased,

    // === Outcome events ===
    /// A failure was logged and swallowed by the policy.
    ///
    /// Sets:
    /// - `command`: command name
    /// - `reason`: error message
    FailureSuppressed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `command`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `command`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the command (or subscriber), if applicable.
    pub command: Option<Arc<str>>,
    /// Human-readable reason (errors, cancellation source, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            command: None,
            reason: None,
        }
    }

    /// Attaches a command name.
    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Log level this event is rendered at.
    ///
    /// Command and start failures are rendered at WARN: the single ERROR line
    /// for them is written by [`OutcomePolicy`](crate::OutcomePolicy) once the
    /// outcome is resolved.
    pub fn level(&self) -> Level {
        match self.kind {
            EventKind::ResolutionFailed | EventKind::SubscriberPanicked => Level::ERROR,
            EventKind::CommandFailed
            | EventKind::HostStartFailed
            | EventKind::HostStopFailed
            | EventKind::SubscriberOverflow => Level::WARN,
            EventKind::FailureSuppressed
            | EventKind::CommandCanceled
            | EventKind::ShutdownRequested
            | EventKind::CommandStarting
            | EventKind::CommandCompleted => Level::INFO,
            EventKind::HostStarting
            | EventKind::HostStarted
            | EventKind::HostStopping
            | EventKind::HostStopped
            | EventKind::HostDisposed
            | EventKind::CommandReleased => Level::DEBUG,
        }
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_command(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_command(subscriber)
            .with_reason(info)
    }
}
