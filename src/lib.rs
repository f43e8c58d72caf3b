//! Request dispatch core for a small modular web framework.
//!
//! Modules register routes, event listeners and handler factories on a
//! shared [`Framework`]; the [`Dispatcher`] matches each request to the most
//! specific route, runs its middleware chain and handler, and turns every
//! failure into a fallback response.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod framework;
pub mod http;
pub mod lifecycle;
pub mod modules;
pub mod observability;
pub mod routing;

pub use config::FrameworkConfig;
pub use dispatch::Dispatcher;
pub use error::FrameworkError;
pub use framework::Framework;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
