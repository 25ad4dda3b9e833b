//! # Command abstractions.
//!
//! This module provides the unit-of-work types:
//! - [`Command`] - trait for implementing async cancelable commands
//! - [`CommandFn`] - closure-backed command
//! - [`CommandRef`] - shared reference to a command (`Arc<dyn Command>`)
//! - [`Activate`] - construction of unregistered command types

#[allow(clippy::module_inception)]
mod command;
mod command_fn;

pub(crate) use command::resolve_command;
pub use command::{Activate, Command, CommandRef};
pub use command_fn::CommandFn;
