//! Runtime core: the invocation pipeline.
//!
//! The public entry point is [`Invoker`], built with [`InvokerBuilder`].
//!
//! Internal modules:
//! - [`linker`]: merges the caller token with the host shutdown token;
//! - [`scope`]: owns the resolved command and guarantees its release;
//! - [`runner`]: runs the command once and classifies the result;
//! - [`policy`]: maps the outcome onto what the caller sees;
//! - [`invoker`]: drives the host through start, run, stop and dispose;
//! - [`builder`]: assembles an invoker.

mod builder;
mod invoker;
mod linker;
mod policy;
mod runner;
mod scope;

pub use builder::InvokerBuilder;
pub use invoker::Invoker;
pub use linker::LinkedToken;
pub use policy::{Outcome, OutcomePolicy};
pub use runner::run_once;
pub use scope::ResourceScope;
