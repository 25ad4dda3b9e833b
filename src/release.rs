//! # Release capability tag.
//!
//! Commands and hosts declare **once** how their resources are given back.
//! The invoker reads the tag when it takes ownership and dispatches on it
//! at the end of the invocation; it never inspects the object again.
//!
//! ```text
//! Release::Async ─► release_async().await / dispose_async().await
//! Release::Sync  ─► release()             / dispose()
//! Release::None  ─► nothing
//! ```

/// How an owned resource is released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Release {
    /// Nothing to release (default).
    #[default]
    None,
    /// Release with the synchronous hook.
    Sync,
    /// Release with the asynchronous hook.
    Async,
}

impl Release {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Release::None => "release_none",
            Release::Sync => "release_sync",
            Release::Async => "release_async",
        }
    }
}
