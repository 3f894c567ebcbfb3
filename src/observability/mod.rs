//! Observability subsystem for snapvault
//!
//! Provides:
//! - Structured logging (JSON, one line per event)
//! - Alert delivery for failures that need operator attention
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on the backup pipeline
//! 3. No async or background threads
//! 4. Deterministic output
//! 5. Secrets never appear in log fields
//!
//! # Usage
//!
//! ```ignore
//! use snapvault::observability::{Logger, AlertSink, LogAlertSink};
//!
//! Logger::info("BACKUP_RUN_COMPLETE", &[("job", "orders"), ("key", key)]);
//!
//! let alerts = LogAlertSink;
//! alerts.raise("DUMP_FAILED", "orders", "exit status 2");
//! ```

mod alerts;
mod logger;

pub use alerts::{severity_for, AlertSeverity, AlertSink, CommandAlertSink, LogAlertSink};
pub use logger::{Logger, Severity};
