//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / module registry:
//!     → logging.rs Logger (failures, load problems) → tracing
//!     → metrics.rs (outcome counters, latency histogram)
//!
//! Everything else:
//!     → tracing macros with structured fields
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through the HTTP layer (tower-http)
//! - Metrics are cheap (facade calls, no-op without an exporter)

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, LogContext, Logger, Severity, TracingLogger};
