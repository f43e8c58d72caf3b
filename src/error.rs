//! Framework error taxonomy.
//!
//! One enum covers everything that can go wrong below the dispatch boundary
//! and during module loading. The dispatcher never lets these reach the
//! transport: they are logged once and replaced by a fallback response.

use std::any::Any;

use thiserror::Error;

/// Boxed error used as the source of middleware, handler and module failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the routing, event and dispatch subsystems.
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// A route, handler or other named item is absent. Expected, not alarming.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A handler or middleware could not be instantiated.
    #[error("failed to construct '{id}': {reason}")]
    Construction { id: String, reason: String },

    /// A middleware failed while running the chain.
    #[error("middleware failed")]
    Middleware(#[source] BoxError),

    /// The request handler at the end of the chain failed.
    #[error("handler failed")]
    Handler(#[source] BoxError),

    /// An event listener failed during publish.
    #[error("listener '{id}' failed")]
    Listener {
        id: String,
        #[source]
        source: BoxError,
    },

    /// Modules form a dependency cycle.
    #[error("circular dependency between: {}", .nodes.join(", "))]
    CircularDependency { nodes: Vec<String> },

    /// Two structurally identical patterns were registered.
    #[error("route pattern '{pattern}' collides with registered pattern '{existing}'")]
    Collision { pattern: String, existing: String },

    /// A route pattern is malformed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// Two module descriptors share a name.
    #[error("ambiguous module '{name}': registered more than once")]
    AmbiguousModule { name: String },

    /// A module lifecycle hook failed.
    #[error("module '{name}' failed")]
    Module {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl FrameworkError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn construction(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn middleware(err: impl Into<BoxError>) -> Self {
        Self::Middleware(err.into())
    }

    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub fn module(name: impl Into<String>, err: impl Into<BoxError>) -> Self {
        Self::Module {
            name: name.into(),
            source: err.into(),
        }
    }

    /// True for the "expected absence" class of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Render the error followed by each `source()` in its chain.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            current = cause.source();
        }
        rendered
    }
}

/// Describe a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}
