//! # Resource scope of one command instance.
//!
//! [`ResourceScope`] resolves the command, reads its [`Release`] kind **once**
//! and owns the instance until [`ResourceScope::release`] runs.
//!
//! ```text
//! acquire(registry, resolve) ──► (command, release kind)
//!        ...invoke...
//! release() ──► Async: release_async().await
//!           ──► Sync:  release()
//!           ──► None:  no-op
//! drop without release() ──► Sync: release()
//!                        ──► Async: spawned release_async() (if a runtime is present)
//! ```
//!
//! ## Rules
//! - Release runs **exactly once** per acquired instance.
//! - A resolution failure yields no scope, so nothing is released.

use tokio::runtime::Handle;

use crate::command::{Command, CommandRef};
use crate::error::ResolutionError;
use crate::host::Registry;
use crate::release::Release;

/// Owns one resolved command for the duration of an invocation.
pub struct ResourceScope {
    command: CommandRef,
    release: Release,
    released: bool,
}

impl ResourceScope {
    /// Resolves the command with `resolve` and takes ownership of it.
    pub fn acquire<R>(registry: &dyn Registry, resolve: R) -> Result<Self, ResolutionError>
    where
        R: FnOnce(&dyn Registry) -> Result<CommandRef, ResolutionError>,
    {
        let command = resolve(registry)?;
        let release = command.release_kind();
        Ok(Self {
            command,
            release,
            released: false,
        })
    }

    /// The owned command.
    pub fn command(&self) -> &dyn Command {
        self.command.as_ref()
    }

    /// Release kind captured at acquisition.
    pub fn release_kind(&self) -> Release {
        self.release
    }

    /// Releases the command. Consumes the scope.
    pub async fn release(mut self) {
        self.released = true;
        match self.release {
            Release::Async => self.command.release_async().await,
            Release::Sync => self.command.release(),
            Release::None => {}
        }
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.release {
            Release::Sync => self.command.release(),
            Release::Async => match Handle::try_current() {
                Ok(handle) => {
                    let command = self.command.clone();
                    handle.spawn(async move { command.release_async().await });
                }
                Err(_) => tracing::warn!(
                    command = self.command.name(),
                    "scope dropped outside a runtime; async release skipped"
                ),
            },
            Release::None => {}
        }
    }
}
