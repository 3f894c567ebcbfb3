//! Alert delivery for failures that need operator attention
//!
//! The backup pipeline never crashes the host data store on failure; it
//! contains the failure to the current run and raises an alert. Every
//! alert kind carries a fixed severity, and sinks below deliver only at
//! or above their configured threshold, so routine noise never pages.
//!
//! Two sinks:
//! - [`LogAlertSink`]: alerts become ERROR-severity log lines, the
//!   default for deployments that ship logs to an alerting backend.
//! - [`CommandAlertSink`]: pipes a severity-tagged payload to an
//!   operator-configured command (mail relay, chat webhook poster),
//!   suppressing alerts below its minimum severity.

use std::io::Write;
use std::process::{Command, Stdio};

use chrono::Utc;
use serde_json::json;

use super::logger::Logger;

/// Severity attached to an alert kind, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

/// Severity of a stable alert kind.
///
/// Missing credentials are CRITICAL (no backup can run at all); a failed
/// dump or upload is HIGH (this run is lost, the next is the retry);
/// retention and replication lag are MEDIUM (a cost problem, not a
/// durability problem yet).
pub fn severity_for(kind: &str) -> AlertSeverity {
    match kind {
        "SECRET_UNAVAILABLE" => AlertSeverity::Critical,
        "DUMP_FAILED" | "PACKAGING_FAILED" | "UPLOAD_FAILED" | "SNAPSHOT_API_FAILED" => {
            AlertSeverity::High
        }
        _ => AlertSeverity::Medium,
    }
}

/// Destination for operator alerts.
///
/// Implementations must be synchronous and must not panic; a failing alert
/// path must never take down the pipeline it reports on.
pub trait AlertSink {
    /// Raise an alert for a failed operation.
    ///
    /// `kind` is a stable machine-readable identifier (e.g. "DUMP_FAILED"),
    /// `subject` names the affected job or prefix, `detail` is free text.
    fn raise(&self, kind: &str, subject: &str, detail: &str);
}

/// Default sink: alerts become ERROR-severity log lines.
///
/// Deployments that ship logs to an alerting backend get paging behavior
/// without any extra wiring.
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&self, kind: &str, subject: &str, detail: &str) {
        Logger::error(
            "ALERT",
            &[
                ("severity", severity_for(kind).as_str()),
                ("kind", kind),
                ("subject", subject),
                ("detail", detail),
            ],
        );
    }
}

/// Sink that pipes each alert to an operator-configured command.
///
/// The command (program + args) receives a JSON payload on stdin with a
/// pre-formatted `summary` line (`[snapvault - <env>] <SEVERITY>: <kind>`)
/// plus the structured fields, so a one-line `mail`/`curl` wrapper can
/// deliver it to any channel. Alerts below `min_severity` are suppressed;
/// the default threshold of HIGH matches paging only on lost runs.
///
/// Delivery failure is logged and swallowed.
pub struct CommandAlertSink {
    environment: String,
    command: Vec<String>,
    min_severity: AlertSeverity,
}

impl CommandAlertSink {
    /// Create a sink delivering through `command`
    pub fn new(environment: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            environment: environment.into(),
            command,
            min_severity: AlertSeverity::High,
        }
    }

    /// Override the minimum severity that gets delivered
    pub fn with_min_severity(mut self, min_severity: AlertSeverity) -> Self {
        self.min_severity = min_severity;
        self
    }

    fn deliver(&self, payload: &[u8]) -> Result<(), String> {
        let program = self
            .command
            .first()
            .ok_or_else(|| "empty alert command".to_string())?;

        let mut child = Command::new(program)
            .args(&self.command[1..])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| format!("spawn '{}': {}", program, e))?;
        child
            .stdin
            .take()
            .ok_or_else(|| "child stdin unavailable".to_string())?
            .write_all(payload)
            .map_err(|e| format!("write to '{}': {}", program, e))?;
        let status = child
            .wait()
            .map_err(|e| format!("wait for '{}': {}", program, e))?;
        if !status.success() {
            return Err(format!("'{}' exited {}", program, status));
        }
        Ok(())
    }
}

impl AlertSink for CommandAlertSink {
    fn raise(&self, kind: &str, subject: &str, detail: &str) {
        let severity = severity_for(kind);
        if severity < self.min_severity {
            Logger::info(
                "ALERT_SUPPRESSED",
                &[("severity", severity.as_str()), ("kind", kind), ("subject", subject)],
            );
            return;
        }

        let summary = format!(
            "[snapvault - {}] {}: {}",
            self.environment,
            severity.as_str(),
            kind
        );
        let payload = json!({
            "summary": summary,
            "severity": severity.as_str(),
            "kind": kind,
            "environment": self.environment,
            "subject": subject,
            "detail": detail,
            "raised_at": Utc::now().to_rfc3339(),
        });
        let mut line = payload.to_string().into_bytes();
        line.push(b'\n');

        match self.deliver(&line) {
            Ok(()) => Logger::info(
                "ALERT_DELIVERED",
                &[("severity", severity.as_str()), ("kind", kind), ("subject", subject)],
            ),
            Err(e) => Logger::error(
                "ALERT_DELIVERY_FAILED",
                &[("kind", kind), ("subject", subject), ("detail", e.as_str())],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct RecordingSink {
        raised: RefCell<Vec<(String, String, String)>>,
    }

    impl AlertSink for RecordingSink {
        fn raise(&self, kind: &str, subject: &str, detail: &str) {
            self.raised
                .borrow_mut()
                .push((kind.to_string(), subject.to_string(), detail.to_string()));
        }
    }

    fn command_sink(env: &str, script: &str) -> CommandAlertSink {
        CommandAlertSink::new(
            env,
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        )
    }

    #[test]
    fn test_sink_records_alerts() {
        let sink = RecordingSink {
            raised: RefCell::new(Vec::new()),
        };

        sink.raise("UPLOAD_FAILED", "orders", "connection reset");

        let raised = sink.raised.borrow();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].0, "UPLOAD_FAILED");
        assert_eq!(raised[0].1, "orders");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::High > AlertSeverity::Medium);
    }

    #[test]
    fn test_kind_severities() {
        assert_eq!(severity_for("SECRET_UNAVAILABLE"), AlertSeverity::Critical);
        assert_eq!(severity_for("DUMP_FAILED"), AlertSeverity::High);
        assert_eq!(severity_for("UPLOAD_FAILED"), AlertSeverity::High);
        assert_eq!(severity_for("SWEEP_FAILED"), AlertSeverity::Medium);
    }

    #[test]
    fn test_command_sink_delivers_formatted_payload() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("alert.json");
        let sink = command_sink("prod", &format!("cat > {}", out.display()));

        sink.raise("UPLOAD_FAILED", "orders", "connection reset");

        let delivered = std::fs::read_to_string(&out).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&delivered).unwrap();
        assert_eq!(payload["summary"], "[snapvault - prod] HIGH: UPLOAD_FAILED");
        assert_eq!(payload["severity"], "HIGH");
        assert_eq!(payload["subject"], "orders");
        assert_eq!(payload["detail"], "connection reset");
    }

    #[test]
    fn test_command_sink_suppresses_below_threshold() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("delivered");
        let sink = command_sink("prod", &format!("touch {}", marker.display()));

        // MEDIUM is below the default HIGH threshold
        sink.raise("SWEEP_FAILED", "prod/orders/", "listing error");
        assert!(!marker.exists());

        let sink = sink.with_min_severity(AlertSeverity::Medium);
        sink.raise("SWEEP_FAILED", "prod/orders/", "listing error");
        assert!(marker.exists());
    }

    #[test]
    fn test_command_sink_swallows_delivery_failure() {
        let sink = command_sink("prod", "exit 1");
        sink.raise("DUMP_FAILED", "orders", "exit status 2");
    }

    #[test]
    fn test_log_sink_does_not_panic() {
        LogAlertSink.raise("SWEEP_FAILED", "prod/orders", "listing error");
    }
}
