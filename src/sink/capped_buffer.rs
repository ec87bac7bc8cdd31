//! Capped buffer sink: the newest entries kept in a single key-value list.
//!
//! Push, trim and publish are three separate commands. If the trim fails
//! after a successful push the list stays over length until the next
//! successful trim.

use super::bounded;
use crate::domain::EncodedEntry;
use crate::error::KahoError;
use crate::port::{KeyValuePool, KvReply, PortFuture, Sink};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// List holding the serialized entries, newest first.
pub const ENTRIES_KEY: &str = "kaho:entries";

/// Channel notified (with an empty message) whenever the list grows.
pub const NOTIFY_CHANNEL: &str = "kaho:entries";

/// Retention of the list.
pub const MAX_ENTRIES: usize = 100_000;

pub struct CappedBufferSink {
    pool: Arc<dyn KeyValuePool>,
    capacity: usize,
}

impl CappedBufferSink {
    #[must_use]
    pub fn new(pool: Arc<dyn KeyValuePool>) -> Self {
        Self {
            pool,
            capacity: MAX_ENTRIES,
        }
    }

    #[must_use]
    pub fn with_capacity(pool: Arc<dyn KeyValuePool>, capacity: NonZeroUsize) -> Self {
        Self {
            pool,
            capacity: capacity.get(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest `count` entries, most recent first.
    pub async fn recent(&self, count: usize) -> Result<Vec<EncodedEntry>, KahoError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let reply = bounded(
            "LRANGE kaho:entries",
            self.pool.command(
                "LRANGE",
                vec![
                    ENTRIES_KEY.to_string(),
                    "0".to_string(),
                    (count - 1).to_string(),
                ],
            ),
        )
        .await?;

        let texts = reply
            .clone()
            .into_texts()
            .ok_or_else(|| KahoError::UnexpectedReply {
                operation: "LRANGE kaho:entries",
                detail: format!("{reply:?}"),
            })?;

        texts
            .iter()
            .map(|text| EncodedEntry::from_json(text))
            .collect()
    }

    async fn push(&self, text: String) -> Result<(), KahoError> {
        let reply = bounded(
            "LPUSH kaho:entries",
            self.pool
                .command("LPUSH", vec![ENTRIES_KEY.to_string(), text]),
        )
        .await?;
        expect_int("LPUSH kaho:entries", reply)
    }

    async fn trim(&self) -> Result<(), KahoError> {
        let reply = bounded(
            "LTRIM kaho:entries",
            self.pool.command(
                "LTRIM",
                vec![
                    ENTRIES_KEY.to_string(),
                    "0".to_string(),
                    (self.capacity - 1).to_string(),
                ],
            ),
        )
        .await?;

        match reply {
            KvReply::Ok => Ok(()),
            other => Err(KahoError::UnexpectedReply {
                operation: "LTRIM kaho:entries",
                detail: format!("{other:?}"),
            }),
        }
    }

    async fn notify(&self) -> Result<(), KahoError> {
        let reply = bounded(
            "PUBLISH kaho:entries",
            self.pool
                .command("PUBLISH", vec![NOTIFY_CHANNEL.to_string(), String::new()]),
        )
        .await?;
        expect_int("PUBLISH kaho:entries", reply)
    }
}

impl Sink for CappedBufferSink {
    fn name(&self) -> &'static str {
        "capped-buffer"
    }

    fn deliver<'a>(&'a self, entry: &'a EncodedEntry) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let text = entry.to_json()?;
            self.push(text).await?;
            self.trim().await?;
            self.notify().await
        })
    }
}

fn expect_int(operation: &'static str, reply: KvReply) -> Result<(), KahoError> {
    match reply {
        KvReply::Int(_) => Ok(()),
        other => Err(KahoError::UnexpectedReply {
            operation,
            detail: format!("{other:?}"),
        }),
    }
}
