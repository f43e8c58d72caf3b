//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Provide the `Logger` seam the dispatcher and module registry report through
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from `RUST_LOG`, falling back to the configured level
//! - `Logger` is fire-and-forget and never fails; tests swap in a recorder

use std::fmt;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;

/// Severity of a reported message, PSR-3 style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// Key/value pairs attached to a log record.
pub type LogContext<'a> = &'a [(&'static str, String)];

/// Logging collaborator.
pub trait Logger: Send + Sync {
    fn log(&self, severity: Severity, message: &str, context: LogContext<'_>);
}

/// Forwards records to `tracing`.
///
/// `Notice` has no tracing level of its own and is emitted at `WARN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, severity: Severity, message: &str, context: LogContext<'_>) {
        let context = ContextDisplay(context);
        match severity {
            Severity::Debug => tracing::debug!(%severity, %context, "{message}"),
            Severity::Info => tracing::info!(%severity, %context, "{message}"),
            Severity::Notice | Severity::Warning => tracing::warn!(%severity, %context, "{message}"),
            Severity::Error => tracing::error!(%severity, %context, "{message}"),
        }
    }
}

struct ContextDisplay<'a>(LogContext<'a>);

impl fmt::Display for ContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value:?}")?;
        }
        Ok(())
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("route_dispatch={},tower_http=info", config.log_level).into());

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
