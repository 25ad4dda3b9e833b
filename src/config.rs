//! # Runtime configuration.
//!
//! Provides [`Config`] (settings of an [`Invoker`](crate::Invoker)) and
//! [`Options`] (outcome handling of one invocation).
//!
//! `Options` is read once, when the outcome is resolved:
//! 1. **Registered**: an `Options` value registered in the host's registry wins.
//! 2. **Flavor default**: otherwise [`Config::default_options`] applies.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by [`Config::bus_capacity_clamped`]

/// Outcome-handling flavor of an invoker.
///
/// Both flavors run the same policy. They differ only in their default
/// [`Options`]: `Strict` re-raises command failures unless told otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Flavor {
    /// The command is a required component: failures propagate by default.
    Strict,
    /// Failures are logged and swallowed unless `throw_exception` is set (default).
    #[default]
    PolicyControlled,
}

/// Per-invocation outcome options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Re-raise command failures to the caller instead of only logging them.
    ///
    /// Cancellation requested by the caller is always re-raised and host
    /// shutdown cancellation never is; this flag does not affect either.
    pub throw_exception: bool,
}

impl Options {
    /// Options that re-raise failures.
    #[inline]
    pub fn throwing() -> Self {
        Self {
            throw_exception: true,
        }
    }
}

/// Configuration of an [`Invoker`](crate::Invoker).
///
/// ## Field semantics
/// - `flavor`: selects the default [`Options`]
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Outcome-handling flavor.
    pub flavor: Flavor,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages
    /// skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Configuration for the strict flavor.
    pub fn strict() -> Self {
        Self {
            flavor: Flavor::Strict,
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Options used when none are registered in the host.
    #[inline]
    pub fn default_options(&self) -> Options {
        match self.flavor {
            Flavor::Strict => Options::throwing(),
            Flavor::PolicyControlled => Options::default(),
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `flavor = Flavor::PolicyControlled`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            flavor: Flavor::default(),
            bus_capacity: 1024,
        }
    }
}
