//! # Function-backed command (`CommandFn`)
//!
//! [`CommandFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per invocation. It is what
//! [`Invoker::invoke_fn`](crate::Invoker::invoke_fn) and
//! [`Invoker::invoke_with`](crate::Invoker::invoke_with) run.
//!
//! Closures have no release hook; anything they need to clean up should be
//! dropped at the end of the returned future.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use hostvisor::{Command, CommandFn, CommandRef, WorkError};
//!
//! let c: CommandRef = CommandFn::arc("greet", |_ctx: CancellationToken| async move {
//!     Ok::<_, WorkError>(())
//! });
//!
//! assert_eq!(c.name(), "greet");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::command::Command;
use crate::error::WorkError;

/// Function-backed command implementation.
#[derive(Debug)]
pub struct CommandFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CommandFn<F> {
    /// Creates a new function-backed command.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the command and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Command for CommandFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, ctx: CancellationToken) -> Result<(), WorkError> {
        (self.f)(ctx).await
    }
}
