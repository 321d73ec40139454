//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every fetch emits exactly one summary event
//! - Request ID flows through the HTTP trace span
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
