//! Module subsystem.
//!
//! # Data Flow
//! ```text
//! Vec<Arc<dyn Module>> + ModulesConfig
//!     → registry.rs (reject duplicates, drop disabled)
//!     → order.rs (topological order from load_before / load_after)
//!     → registry.rs load_all (on_load per module, failures isolated)
//!         → Framework (routes, listeners, handler factories)
//! ```
//!
//! # Design Decisions
//! - Modules are an explicit list, never discovered from the filesystem
//! - A cycle or unknown reference is reported, not fatal
//! - `core.rs` is an ordinary module; it can be disabled like any other

pub mod core;
pub mod order;
pub mod registry;

pub use self::core::CoreModule;
pub use order::{topological_order, DependencyNode, MissingReference, Ordering};
pub use registry::{Module, ModuleRegistry};
