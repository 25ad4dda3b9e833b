//! Error types used by the hostvisor runtime and commands.
//!
//! This module defines four error enums:
//!
//! - [`InvokeError`]: what the caller of [`Invoker`](crate::Invoker) observes.
//! - [`WorkError`]: what a [`Command`](crate::Command) returns from `invoke`.
//! - [`ResolutionError`]: failures to resolve a command or service from a
//!   [`Registry`](crate::Registry).
//! - [`HostError`]: failures raised by a [`Host`](crate::Host) while building,
//!   starting or stopping.
//!
//! All of them provide `as_label` for logging/metrics.

use std::any::type_name;
use std::error::Error as StdError;

use thiserror::Error;

/// Type-erased error carried through the pipeline without losing its concrete type.
///
/// Callers can recover the original value with `downcast_ref`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// # Errors observed by the caller of an invocation.
///
/// [`InvokeError::Build`], [`InvokeError::Configuration`] and
/// [`InvokeError::Canceled`] are raised unconditionally; [`InvokeError::Failed`] is gated by
/// [`Options::throw_exception`](crate::Options::throw_exception).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The command could not be resolved; the host was never started.
    #[error("configuration error: {0}")]
    Configuration(#[from] ResolutionError),

    /// The caller's own token was cancelled.
    #[error("operation was canceled")]
    Canceled,

    /// The command (or host start) failed with the wrapped error.
    #[error("invocation failed: {0}")]
    Failed(#[source] BoxError),

    /// The host could not be built.
    #[error("host build failed: {0}")]
    Build(#[source] HostError),
}

impl InvokeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hostvisor::InvokeError;
    ///
    /// assert_eq!(InvokeError::Canceled.as_label(), "invoke_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InvokeError::Configuration(_) => "invoke_configuration",
            InvokeError::Canceled => "invoke_canceled",
            InvokeError::Failed(_) => "invoke_failed",
            InvokeError::Build(_) => "invoke_build",
        }
    }

    /// True if this is a cancellation requested by the caller.
    pub fn is_canceled(&self) -> bool {
        matches!(self, InvokeError::Canceled)
    }

    /// Returns the wrapped failure downcast to `E`, if it is one.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            InvokeError::Failed(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// # Errors returned by a command.
///
/// [`WorkError::Canceled`] is the cancellation indicator: return it when the
/// token passed to `invoke` fires. Anything else goes into [`WorkError::Failed`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkError {
    /// The command observed cancellation and stopped.
    #[error("command canceled")]
    Canceled,

    /// The command failed.
    #[error("command failed: {0}")]
    Failed(#[source] BoxError),

    /// The command panicked; the runner caught the unwind.
    #[error("command panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl WorkError {
    /// Wraps any error as [`WorkError::Failed`].
    ///
    /// # Example
    /// ```
    /// use hostvisor::WorkError;
    ///
    /// let err = WorkError::fail(std::io::Error::other("disk full"));
    /// assert_eq!(err.as_label(), "work_failed");
    /// ```
    pub fn fail(err: impl Into<BoxError>) -> Self {
        WorkError::Failed(err.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Canceled => "work_canceled",
            WorkError::Failed(_) => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
        }
    }
}

impl From<BoxError> for WorkError {
    fn from(err: BoxError) -> Self {
        WorkError::Failed(err)
    }
}

/// # Errors raised while resolving a service or command.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Nothing is registered for the type and it cannot be activated.
    #[error("no service registered for `{type_name}`")]
    NotRegistered {
        /// Name of the requested type.
        type_name: &'static str,
    },

    /// A registration exists but stores a value of a different type.
    #[error("service registered for `{type_name}` has a mismatched type")]
    TypeMismatch {
        /// Name of the requested type.
        type_name: &'static str,
    },

    /// A factory or activation ran but could not build the value.
    #[error("failed to construct `{type_name}`: {reason}")]
    Construction {
        /// Name of the requested type.
        type_name: &'static str,
        /// Human-readable cause.
        reason: String,
    },

    /// A command is registered as a singleton, so it would outlive its release.
    #[error("command `{type_name}` is registered as a singleton; register it scoped or transient")]
    Shared {
        /// Name of the requested type.
        type_name: &'static str,
    },
}

impl ResolutionError {
    /// Shorthand for [`ResolutionError::NotRegistered`] of `T`.
    pub fn not_registered<T: ?Sized>() -> Self {
        ResolutionError::NotRegistered {
            type_name: type_name::<T>(),
        }
    }

    /// Shorthand for [`ResolutionError::Construction`] of `T`.
    pub fn construction<T: ?Sized>(reason: impl Into<String>) -> Self {
        ResolutionError::Construction {
            type_name: type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolutionError::NotRegistered { .. } => "resolution_not_registered",
            ResolutionError::TypeMismatch { .. } => "resolution_type_mismatch",
            ResolutionError::Construction { .. } => "resolution_construction",
            ResolutionError::Shared { .. } => "resolution_shared",
        }
    }
}

/// # Errors raised by a host.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// Start was aborted because the supplied token was cancelled.
    #[error("host start canceled")]
    Canceled,

    /// Building the host failed.
    #[error("host build failed: {reason}")]
    Build {
        /// Human-readable cause.
        reason: String,
    },

    /// A hosted service failed to start.
    #[error("service `{service}` failed to start: {source}")]
    Start {
        /// Service name.
        service: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// A hosted service failed to stop.
    #[error("service `{service}` failed to stop: {source}")]
    Stop {
        /// Service name.
        service: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hostvisor::HostError;
    ///
    /// assert_eq!(HostError::Canceled.as_label(), "host_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::Canceled => "host_canceled",
            HostError::Build { .. } => "host_build",
            HostError::Start { .. } => "host_start",
            HostError::Stop { .. } => "host_stop",
        }
    }
}
