use crate::domain::{EncodedEntry, Severity};
use crate::port::{PortFuture, Sink};
use tracing::{debug, error, info, warn};

/// Tracing target of every console entry. The process filter enables it at
/// every level so `DEBUG` entries are written too.
pub const CONSOLE_TARGET: &str = "kaho_console";

/// Writes entries to the process log stream (the installed `tracing` subscriber).
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn write(entry: &EncodedEntry) {
        let line = if entry.has_payload() {
            format!(
                "[{}][{}] {} • {}",
                entry.service, entry.severity, entry.message, entry.payload
            )
        } else {
            format!("[{}][{}] {}", entry.service, entry.severity, entry.message)
        };

        match entry.severity {
            Severity::Debug => debug!(target: CONSOLE_TARGET, "{line}"),
            Severity::Default | Severity::Info | Severity::Notice => info!(target: CONSOLE_TARGET, "{line}"),
            Severity::Warning => warn!(target: CONSOLE_TARGET, "{line}"),
            Severity::Error
            | Severity::Critical
            | Severity::Alert
            | Severity::Emergency
            | Severity::Fatal => error!(target: CONSOLE_TARGET, "{line}"),
        }
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn deliver<'a>(&'a self, entry: &'a EncodedEntry) -> PortFuture<'a, ()> {
        Self::write(entry);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogEntry;
    use serde_json::json;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn writes_service_severity_and_message() {
        let entry = LogEntry::new(Severity::Warning, "GIN", "Running With No Proxy")
            .encode()
            .unwrap();

        ConsoleSink::new().deliver(&entry).await.unwrap();

        assert!(logs_contain("[GIN][WARNING] Running With No Proxy"));
        assert!(!logs_contain("•"));
    }

    #[traced_test]
    #[tokio::test]
    async fn appends_payload_when_present() {
        let entry = LogEntry::new(Severity::Error, "SQL", "query failed")
            .with_payload(json!({"code": "42P01"}))
            .encode()
            .unwrap();

        ConsoleSink::new().deliver(&entry).await.unwrap();

        assert!(logs_contain(r#"[SQL][ERROR] query failed • {"code":"42P01"}"#));
    }

    #[traced_test]
    #[tokio::test]
    async fn fatal_is_written_at_error_level() {
        let entry = LogEntry::new(Severity::Fatal, "GIN", "Failed to start HTTP Server")
            .encode()
            .unwrap();

        ConsoleSink::new().deliver(&entry).await.unwrap();

        logs_assert(|lines: &[&str]| {
            let matching: Vec<_> = lines
                .iter()
                .filter(|line| line.contains("[GIN][FATAL]"))
                .collect();
            match matching.as_slice() {
                [line] if line.contains("ERROR") => Ok(()),
                other => Err(format!("unexpected console lines: {other:?}")),
            }
        });
    }
}
