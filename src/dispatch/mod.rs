//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request (method, path, headers, cookies)
//!     → pipeline.rs Dispatcher::process
//!         → routing snapshot + matcher
//!         → BeforeDispatch event
//!         → container.rs (construct handler + middlewares by id)
//!         → chain.rs (middleware₁ → … → handler)
//!         → AfterDispatch event
//!     → Response (status, headers, body)
//! ```
//!
//! # Design Decisions
//! - Fail-safe at the boundary: a bad request yields a fallback response, never a crash
//! - Construction is an external seam (`Constructor`) so tests and embedders can swap it

pub mod chain;
pub mod container;
pub mod pipeline;

pub use chain::{Handler, Middleware, Next};
pub use container::{Constructor, Container, FactoryCheckpoint, HandlerFactory, MiddlewareFactory};
pub use pipeline::Dispatcher;
