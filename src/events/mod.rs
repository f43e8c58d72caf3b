//! Event subsystem.
//!
//! # Data Flow
//! ```text
//! Module load:
//!     register::<E>(listener id, listener) → bus.rs registry
//!
//! Dispatch / server lifecycle:
//!     publisher builds event (lifecycle.rs)
//!     → bus.rs publish: listeners in registration order
//!     → stop flag checked after each listener
//!     → publisher reads the mutated event back
//! ```
//!
//! # Design Decisions
//! - Events are typed; the registry is keyed by `TypeId`
//! - Events are lent to listeners (`&mut`), never retained by them
//! - The bus is pure fan-out: listener errors go back to the publisher

pub mod bus;
pub mod lifecycle;

pub use bus::{Event, EventBus, Listener, ListenerCheckpoint};
pub use lifecycle::{AfterDispatch, BeforeDispatch, ServerStarted, ServerStopping};
