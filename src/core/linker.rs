//! # Linked cancellation token.
//!
//! Merges the caller's token and the host's shutdown token into the single
//! token handed to a command.
//!
//! ```text
//! shutdown ──(child_token)──────────────────┐
//!                                           ├──► linked
//! external ──► watcher task ──► cancel() ───┘
//! ```
//!
//! ## Rules
//! - [`LinkedToken::is_cancelled`] is true as soon as either source is cancelled.
//! - The shutdown side propagates natively through `child_token`, so
//!   [`LinkedToken::token`] observes it synchronously.
//! - The external side is watched by a task: [`LinkedToken::token`] observes a
//!   caller cancellation once that task is scheduled (one scheduler hop).
//! - The watcher is **aborted on drop**, so no subscription outlives the
//!   invocation.
//! - An already cancelled `external` cancels `linked` synchronously.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Token cancelled when either of two sources is cancelled.
///
/// Must be created within a Tokio runtime.
#[derive(Debug)]
pub struct LinkedToken {
    token: CancellationToken,
    external: CancellationToken,
    watcher: Option<JoinHandle<()>>,
}

impl LinkedToken {
    /// Links `external` (caller) and `shutdown` (host) into one token.
    pub fn link(external: &CancellationToken, shutdown: &CancellationToken) -> Self {
        let token = shutdown.child_token();
        let external = external.clone();
        if external.is_cancelled() {
            token.cancel();
            return Self {
                token,
                external,
                watcher: None,
            };
        }

        let source = external.clone();
        let linked = token.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                _ = source.cancelled() => linked.cancel(),
                _ = linked.cancelled() => {}
            }
        });

        Self {
            token,
            external,
            watcher: Some(watcher),
        }
    }

    /// The merged token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once either source has been cancelled.
    ///
    /// Unlike polling [`token`](Self::token), this never lags the caller side.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.external.is_cancelled()
    }
}

impl Drop for LinkedToken {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
