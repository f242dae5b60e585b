//! Prometheus metrics and structured logging for the holdings ledger.
//!
//! Provides:
//! - Prometheus metrics for claims, releases, reconciliation and waits
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
