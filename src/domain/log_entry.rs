use super::Severity;
use crate::error::KahoError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Machine-readable value attached to an entry.
///
/// Anything `Serialize` qualifies. Encoding happens at dispatch time and a
/// failure is reported to the caller instead of dropping the value.
pub trait Payload: Send + Sync {
    fn to_json(&self) -> Result<Value, serde_json::Error>;
}

impl<T> Payload for T
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// One observable event, built once by a producer and never mutated.
#[derive(Clone)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    severity: Severity,
    service: String,
    message: String,
    payload: Option<Arc<dyn Payload>>,
}

impl LogEntry {
    /// Create an entry stamped with the current time and no payload.
    pub fn new(severity: Severity, service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            service: service.into(),
            message: message.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload<P>(mut self, payload: P) -> Self
    where
        P: Payload + 'static,
    {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Override the producer timestamp (e.g. the start of an HTTP request).
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Encode the entry into its wire form. Fails if the payload cannot be
    /// represented as JSON.
    pub fn encode(&self) -> Result<EncodedEntry, KahoError> {
        let payload = match &self.payload {
            Some(payload) => payload.to_json()?,
            None => Value::Null,
        };

        Ok(EncodedEntry {
            timestamp: self.timestamp,
            severity: self.severity,
            service: self.service.clone(),
            message: self.message.clone(),
            payload,
        })
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEntry")
            .field("timestamp", &self.timestamp)
            .field("severity", &self.severity)
            .field("service", &self.service)
            .field("message", &self.message)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Wire form of an entry as handed to sinks and stored in the capped buffer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EncodedEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub service: String,
    pub message: String,
    pub payload: Value,
}

impl EncodedEntry {
    pub fn has_payload(&self) -> bool {
        !self.payload.is_null()
    }

    /// Payload as JSON text; `null` when absent.
    pub fn payload_text(&self) -> Result<String, KahoError> {
        Ok(serde_json::to_string(&self.payload)?)
    }

    pub fn to_json(&self) -> Result<String, KahoError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, KahoError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Row read back from the durable store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEntry {
    pub id: i64,
    pub timestamp: Option<NaiveDateTime>,
    pub severity: Severity,
    pub service: String,
    pub message: String,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct RequestInfo {
        method: &'static str,
        status: u16,
    }

    #[test]
    fn encode_without_payload_uses_null() {
        let entry = LogEntry::new(Severity::Info, "GIN", "hello");
        let encoded = entry.encode().unwrap();

        assert!(!encoded.has_payload());
        assert_eq!(encoded.payload_text().unwrap(), "null");
        assert_eq!(encoded.service, "GIN");
        assert_eq!(encoded.severity, Severity::Info);
    }

    #[test]
    fn encode_keeps_structured_payload() {
        let entry = LogEntry::new(Severity::Info, "HTTP", "200 GET /").with_payload(RequestInfo {
            method: "GET",
            status: 200,
        });
        let encoded = entry.encode().unwrap();

        assert_eq!(encoded.payload, json!({"method": "GET", "status": 200}));
    }

    #[test]
    fn encode_fails_for_non_string_map_keys() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple key");
        let entry = LogEntry::new(Severity::Error, "svc", "bad payload").with_payload(bad);

        let err = entry.encode().unwrap_err();
        assert!(matches!(err, KahoError::Encode(_)));
    }

    #[test]
    fn wire_form_uses_payload_field_and_upper_case_severity() {
        let timestamp = "2025-01-10T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let entry = LogEntry::new(Severity::Warning, "GIN", "Running With No Proxy").at(timestamp);
        let text = entry.encode().unwrap().to_json().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["severity"], "WARNING");
        assert_eq!(value["payload"], Value::Null);
        assert_eq!(value["timestamp"], "2025-01-10T12:00:00Z");

        let decoded = EncodedEntry::from_json(&text).unwrap();
        assert_eq!(decoded.message, "Running With No Proxy");
    }

    #[test]
    fn debug_does_not_encode_payload() {
        let entry = LogEntry::new(Severity::Debug, "svc", "msg").with_payload(json!({"k": 1}));
        let debug = format!("{entry:?}");
        assert!(debug.contains("has_payload: true"));
    }
}
