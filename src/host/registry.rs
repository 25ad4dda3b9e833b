//! # Service registry.
//!
//! [`Registry`] is the narrow lookup interface the invoker and commands see.
//! It is always passed explicitly (`&dyn Registry`); there is no ambient
//! container.
//!
//! [`ServiceRegistry`] is the in-crate implementation used by
//! [`HostBuilder`](crate::HostBuilder):
//! - **singletons**: one shared value per type, shared by every clone;
//! - **scoped**: a factory invoked at most once per registry clone, so every
//!   host built by [`HostBuilder`](crate::HostBuilder) gets its own instance;
//! - **transients**: a factory invoked on every resolution, with registry access.
//!
//! Commands must be registered as scoped or transient: a singleton command
//! would be released by one invocation and reused by the next.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use hostvisor::{Registry, ServiceRegistry};
//!
//! struct Greeting(&'static str);
//! struct Banner(String);
//!
//! let mut services = ServiceRegistry::new();
//! services.add_singleton(Greeting("hello"));
//! services.add_transient(|r: &dyn Registry| {
//!     let g = r.resolve::<Greeting>()?;
//!     Ok(Banner(format!("*** {} ***", g.0)))
//! });
//!
//! let registry: &dyn Registry = &services;
//! assert_eq!(registry.resolve::<Banner>().unwrap().0, "*** hello ***");
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::ResolutionError;

/// Type-erased service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&dyn Registry) -> Result<Service, ResolutionError> + Send + Sync>;

/// How a service is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// One value shared by every registry clone.
    Singleton,
    /// One value per registry clone, built on first resolution.
    Scoped,
    /// A new value on every resolution.
    Transient,
}

/// Service lookup by type.
pub trait Registry: Send + Sync {
    /// Resolves the service registered for `ty`.
    ///
    /// Fails with [`ResolutionError::NotRegistered`] when nothing is registered.
    fn resolve_any(&self, ty: TypeId, type_name: &'static str) -> Result<Service, ResolutionError>;

    /// How `ty` is registered, or `None` if it is not.
    fn registration(&self, ty: TypeId) -> Option<Registration>;
}

impl dyn Registry + '_ {
    /// Resolves a service of type `T`.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolutionError> {
        self.resolve_any(TypeId::of::<T>(), type_name::<T>())?
            .downcast::<T>()
            .map_err(|_| ResolutionError::TypeMismatch {
                type_name: type_name::<T>(),
            })
    }

    /// Resolves a service of type `T`, returning `None` if `T` is not registered.
    ///
    /// Failures while building a registered `T` (including its own missing
    /// dependencies) are still errors.
    pub fn try_resolve<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>, ResolutionError> {
        if self.registration(TypeId::of::<T>()).is_none() {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }
}

enum Entry {
    Singleton(Service),
    Scoped {
        factory: Factory,
        instance: OnceLock<Service>,
    },
    Transient(Factory),
}

impl Clone for Entry {
    /// Scoped entries start empty in the clone.
    fn clone(&self) -> Self {
        match self {
            Entry::Singleton(svc) => Entry::Singleton(Arc::clone(svc)),
            Entry::Scoped { factory, .. } => Entry::Scoped {
                factory: Arc::clone(factory),
                instance: OnceLock::new(),
            },
            Entry::Transient(factory) => Entry::Transient(Arc::clone(factory)),
        }
    }
}

impl Entry {
    fn registration(&self) -> Registration {
        match self {
            Entry::Singleton(_) => Registration::Singleton,
            Entry::Scoped { .. } => Registration::Scoped,
            Entry::Transient(_) => Registration::Transient,
        }
    }
}

/// TypeId-keyed registry of singletons and factories.
///
/// Cloning is cheap: a clone shares the same singleton instances and
/// factories, while scoped instances are built anew per clone.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` as the singleton for `T`, replacing any earlier entry.
    pub fn add_singleton<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.add_shared(Arc::new(value))
    }

    /// Registers an already shared singleton for `T`.
    pub fn add_shared<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> &mut Self {
        self.entries
            .insert(TypeId::of::<T>(), Entry::Singleton(value));
        self
    }

    /// Registers a factory producing one `T` per registry clone.
    ///
    /// The factory runs on the first resolution in each clone; later
    /// resolutions in the same clone return that instance.
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Registry) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        let entry = Entry::Scoped {
            factory: erase(factory),
            instance: OnceLock::new(),
        };
        self.entries.insert(TypeId::of::<T>(), entry);
        self
    }

    /// Registers a factory producing a new `T` on every resolution.
    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Registry) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        self.entries
            .insert(TypeId::of::<T>(), Entry::Transient(erase(factory)));
        self
    }

    /// True if anything is registered for `T`.
    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&dyn Registry) -> Result<T, ResolutionError> + Send + Sync + 'static,
{
    Arc::new(move |r: &dyn Registry| factory(r).map(|v| Arc::new(v) as Service))
}

impl Registry for ServiceRegistry {
    fn resolve_any(&self, ty: TypeId, type_name: &'static str) -> Result<Service, ResolutionError> {
        match self.entries.get(&ty) {
            Some(Entry::Singleton(svc)) => Ok(Arc::clone(svc)),
            Some(Entry::Scoped { factory, instance }) => {
                if let Some(svc) = instance.get() {
                    return Ok(Arc::clone(svc));
                }
                let built = factory(self)?;
                Ok(Arc::clone(instance.get_or_init(|| built)))
            }
            Some(Entry::Transient(factory)) => factory(self),
            None => Err(ResolutionError::NotRegistered { type_name }),
        }
    }

    fn registration(&self, ty: TypeId) -> Option<Registration> {
        self.entries.get(&ty).map(Entry::registration)
    }
}
