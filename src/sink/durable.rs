//! Durable sink: one row per entry in `kaho.entries`.
//!
//! The insert and the optional broadcast are independent remote calls. If the
//! broadcast fails the row is already committed and the error is still
//! returned; subscribers simply miss that notification.

use super::bounded;
use crate::domain::{EncodedEntry, Severity, StoredEntry};
use crate::error::KahoError;
use crate::port::{KeyValuePool, KvReply, PortFuture, RelationalPool, Sink, SqlRow, SqlValue};
use std::sync::Arc;
use tracing::debug;

/// Channel that receives the id of every newly stored entry.
pub const CREATE_CHANNEL: &str = "kaho:create";

pub const SCHEMA: &str = r#"
CREATE SCHEMA IF NOT EXISTS kaho;

CREATE TABLE IF NOT EXISTS kaho.entries (
    id BIGSERIAL NOT NULL PRIMARY KEY,
    "timestamp" timestamp without time zone DEFAULT CURRENT_TIMESTAMP,
    severity text,
    service text,
    message text,
    payload text
) WITH (autovacuum_enabled='true');"#;

const INSERT_ENTRY: &str = r"
    INSERT INTO kaho.entries (severity, service, message, payload)
    VALUES ($1, $2, $3, $4)
    RETURNING id";

const SELECT_ENTRY: &str = r#"
    SELECT id, "timestamp", severity, service, message, payload
    FROM kaho.entries
    WHERE id = $1"#;

pub struct DurableSink {
    pool: Arc<dyn RelationalPool>,
    broadcast: Option<Arc<dyn KeyValuePool>>,
}

impl DurableSink {
    #[must_use]
    pub fn new(pool: Arc<dyn RelationalPool>) -> Self {
        Self {
            pool,
            broadcast: None,
        }
    }

    /// Publish the generated id on `CREATE_CHANNEL` after each insert.
    #[must_use]
    pub fn with_broadcast(mut self, key_value: Arc<dyn KeyValuePool>) -> Self {
        self.broadcast = Some(key_value);
        self
    }

    pub fn broadcasts(&self) -> bool {
        self.broadcast.is_some()
    }

    /// Create the `kaho` schema and entries table if missing.
    pub async fn initialize(pool: &dyn RelationalPool) -> Result<(), KahoError> {
        bounded("CREATE TABLE kaho.entries", pool.execute(SCHEMA, Vec::new())).await?;
        Ok(())
    }

    /// Insert the entry and return the store-generated id.
    pub async fn insert(&self, entry: &EncodedEntry) -> Result<i64, KahoError> {
        let params = vec![
            SqlValue::Text(entry.severity.as_str().to_string()),
            SqlValue::Text(entry.service.clone()),
            SqlValue::Text(entry.message.clone()),
            SqlValue::Text(entry.payload_text()?),
        ];

        let rows = bounded("INSERT kaho.entries", self.pool.query(INSERT_ENTRY, params)).await?;

        rows.first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_int)
            .ok_or_else(|| KahoError::UnexpectedReply {
                operation: "INSERT kaho.entries",
                detail: format!("expected a generated id, got {rows:?}"),
            })
    }

    /// Read a stored entry back by its generated id.
    pub async fn fetch(&self, id: i64) -> Result<Option<StoredEntry>, KahoError> {
        let rows = bounded(
            "SELECT kaho.entries",
            self.pool.query(SELECT_ENTRY, vec![SqlValue::Int(id)]),
        )
        .await?;

        rows.into_iter().next().map(decode_row).transpose()
    }

    async fn publish_id(&self, key_value: &dyn KeyValuePool, id: i64) -> Result<(), KahoError> {
        let reply = bounded(
            "PUBLISH kaho:create",
            key_value.command("PUBLISH", vec![CREATE_CHANNEL.to_string(), id.to_string()]),
        )
        .await?;

        match reply {
            KvReply::Int(receivers) => {
                debug!("Broadcast entry {id} to {receivers} subscriber(s)");
                Ok(())
            }
            other => Err(KahoError::UnexpectedReply {
                operation: "PUBLISH kaho:create",
                detail: format!("{other:?}"),
            }),
        }
    }
}

impl Sink for DurableSink {
    fn name(&self) -> &'static str {
        "durable"
    }

    fn deliver<'a>(&'a self, entry: &'a EncodedEntry) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let id = self.insert(entry).await?;

            if let Some(key_value) = &self.broadcast {
                self.publish_id(key_value.as_ref(), id).await?;
            }

            Ok(())
        })
    }
}

fn decode_row(row: SqlRow) -> Result<StoredEntry, KahoError> {
    let malformed = |detail: String| KahoError::UnexpectedReply {
        operation: "SELECT kaho.entries",
        detail,
    };

    let [id, timestamp, severity, service, message, payload]: [SqlValue; 6] = row
        .try_into()
        .map_err(|row: SqlRow| malformed(format!("expected 6 columns, got {}", row.len())))?;

    let id = id
        .as_int()
        .ok_or_else(|| malformed(format!("id column: {id:?}")))?;
    let timestamp = match timestamp {
        SqlValue::Timestamp(at) => Some(at),
        _ => None,
    };
    let severity = severity
        .as_text()
        .ok_or_else(|| malformed("severity column is not text".to_string()))?
        .parse::<Severity>()
        .map_err(|e| malformed(e.to_string()))?;
    let payload = match payload {
        SqlValue::Text(text) => serde_json::from_str(&text)
            .map_err(|e| malformed(format!("payload column: {e}")))?,
        _ => serde_json::Value::Null,
    };

    Ok(StoredEntry {
        id,
        timestamp,
        severity,
        service: text_or_empty(service),
        message: text_or_empty(message),
        payload,
    })
}

fn text_or_empty(value: SqlValue) -> String {
    match value {
        SqlValue::Text(text) => text,
        _ => String::new(),
    }
}
