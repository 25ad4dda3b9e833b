//! # Command abstraction.
//!
//! A [`Command`] is the unit of work run by an [`Invoker`](crate::Invoker).
//! It receives a linked [`CancellationToken`] that fires when either the caller
//! or the host asks to stop, and it should return [`WorkError::Canceled`] once
//! it notices.
//!
//! Commands that own resources declare a [`Release`] kind; the invoker calls
//! the matching hook exactly once after the host has stopped.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ResolutionError, WorkError};
use crate::host::{Registration, Registry};
use crate::release::Release;

/// # Shared handle to a command object.
pub type CommandRef = Arc<dyn Command>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use hostvisor::{Command, Release, WorkError};
///
/// struct Export;
///
/// #[async_trait]
/// impl Command for Export {
///     fn name(&self) -> &str { "export" }
///
///     async fn invoke(&self, ctx: CancellationToken) -> Result<(), WorkError> {
///         if ctx.is_cancelled() {
///             return Err(WorkError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
///
///     fn release_kind(&self) -> Release { Release::Sync }
///
///     fn release(&self) {
///         // flush files...
///     }
/// }
/// ```
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// Returns a stable, human-readable command name used in events and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs the command until completion or cancellation.
    async fn invoke(&self, ctx: CancellationToken) -> Result<(), WorkError>;

    /// Declares which release hook to call. Read once, at acquisition.
    fn release_kind(&self) -> Release {
        Release::None
    }

    /// Synchronous release hook, used for [`Release::Sync`].
    fn release(&self) {}

    /// Asynchronous release hook, used for [`Release::Async`].
    async fn release_async(&self) {}
}

/// # Construction of a command that is not registered.
///
/// [`Invoker::invoke`](crate::Invoker::invoke) first looks the command type up
/// in the host registry; when nothing is registered it activates a fresh
/// instance through this trait, resolving dependencies from the same registry.
///
/// A registered command must be scoped or transient
/// ([`ServiceRegistry::add_scoped`](crate::ServiceRegistry::add_scoped),
/// [`ServiceRegistry::add_transient`](crate::ServiceRegistry::add_transient)).
/// Singleton registrations are rejected with [`ResolutionError::Shared`]
/// because the instance is released at the end of every invocation.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use hostvisor::{Activate, Lifetime, Registry, ResolutionError};
///
/// struct Report {
///     lifetime: Arc<Lifetime>,
/// }
///
/// impl Activate for Report {
///     fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError> {
///         Ok(Self { lifetime: registry.resolve::<Lifetime>()? })
///     }
/// }
/// ```
pub trait Activate: Sized + Send + Sync + 'static {
    /// Builds a new instance, resolving dependencies from `registry`.
    fn activate(registry: &dyn Registry) -> Result<Self, ResolutionError>;
}

/// Resolves `T` from the registry, falling back to [`Activate::activate`].
pub(crate) fn resolve_command<T>(registry: &dyn Registry) -> Result<CommandRef, ResolutionError>
where
    T: Command + Activate,
{
    match registry.registration(TypeId::of::<T>()) {
        None => Ok(Arc::new(T::activate(registry)?)),
        Some(Registration::Singleton) => Err(ResolutionError::Shared {
            type_name: type_name::<T>(),
        }),
        Some(Registration::Scoped | Registration::Transient) => Ok(registry.resolve::<T>()?),
    }
}
