//! Handler and middleware construction.
//!
//! The dispatcher asks a [`Constructor`] for fresh instances on every
//! request. [`Container`] is the in-process implementation: modules register
//! factory closures under string identifiers during load.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::dispatch::chain::{Handler, Middleware};
use crate::error::FrameworkError;
use crate::routing::Route;

pub type HandlerFactory = Arc<dyn Fn(&Route) -> Result<Box<dyn Handler>, FrameworkError> + Send + Sync>;
pub type MiddlewareFactory = Arc<dyn Fn(&Route) -> Result<Box<dyn Middleware>, FrameworkError> + Send + Sync>;

/// Builds handler and middleware instances by identifier.
///
/// Implementations must not cache instances across calls: handlers may carry
/// state derived from the per-request route clone.
pub trait Constructor: Send + Sync {
    fn construct_handler(&self, id: &str, route: &Route) -> Result<Box<dyn Handler>, FrameworkError>;

    fn construct_middleware(&self, id: &str, route: &Route) -> Result<Box<dyn Middleware>, FrameworkError>;
}

/// Registry of factories keyed by identifier.
#[derive(Default)]
pub struct Container {
    handlers: DashMap<String, HandlerFactory>,
    middlewares: DashMap<String, MiddlewareFactory>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&self, id: impl Into<String>, factory: F)
    where
        F: Fn(&Route) -> Result<Box<dyn Handler>, FrameworkError> + Send + Sync + 'static,
    {
        let id = id.into();
        tracing::debug!(handler = %id, "Handler factory registered");
        self.handlers.insert(id, Arc::new(factory));
    }

    pub fn register_middleware<F>(&self, id: impl Into<String>, factory: F)
    where
        F: Fn(&Route) -> Result<Box<dyn Middleware>, FrameworkError> + Send + Sync + 'static,
    {
        let id = id.into();
        tracing::debug!(middleware = %id, "Middleware factory registered");
        self.middlewares.insert(id, Arc::new(factory));
    }

    pub fn unregister_handler(&self, id: &str) -> bool {
        self.handlers.remove(id).is_some()
    }

    pub fn unregister_middleware(&self, id: &str) -> bool {
        self.middlewares.remove(id).is_some()
    }

    pub fn has_handler(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn has_middleware(&self, id: &str) -> bool {
        self.middlewares.contains_key(id)
    }
}

impl Container {
    pub fn checkpoint(&self) -> FactoryCheckpoint {
        FactoryCheckpoint {
            handlers: self.handlers.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            middlewares: self.middlewares.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
        }
    }

    /// Undo factory changes made since `checkpoint`.
    pub fn restore(&self, checkpoint: FactoryCheckpoint) {
        restore_factories(&self.handlers, checkpoint.handlers);
        restore_factories(&self.middlewares, checkpoint.middlewares);
    }
}

/// Registered factories at one instant; see [`Container::restore`].
#[derive(Clone, Default)]
pub struct FactoryCheckpoint {
    handlers: HashMap<String, HandlerFactory>,
    middlewares: HashMap<String, MiddlewareFactory>,
}

fn restore_factories<F: ?Sized>(live: &DashMap<String, Arc<F>>, earlier: HashMap<String, Arc<F>>) {
    live.retain(|id, factory| earlier.get(id).is_some_and(|e| Arc::ptr_eq(e, factory)));
    for (id, factory) in earlier {
        live.entry(id).or_insert(factory);
    }
}

impl Constructor for Container {
    fn construct_handler(&self, id: &str, route: &Route) -> Result<Box<dyn Handler>, FrameworkError> {
        // Clone the factory out so no shard lock is held while it runs.
        let factory = self
            .handlers
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FrameworkError::construction(id, "no handler registered under this identifier"))?;

        factory(route).map_err(|err| wrap_construction(id, err))
    }

    fn construct_middleware(&self, id: &str, route: &Route) -> Result<Box<dyn Middleware>, FrameworkError> {
        let factory = self
            .middlewares
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FrameworkError::construction(id, "no middleware registered under this identifier"))?;

        factory(route).map_err(|err| wrap_construction(id, err))
    }
}

fn wrap_construction(id: &str, err: FrameworkError) -> FrameworkError {
    match err {
        err @ FrameworkError::Construction { .. } => err,
        other => FrameworkError::construction(id, other.chain()),
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("handlers", &self.handlers.len())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}
