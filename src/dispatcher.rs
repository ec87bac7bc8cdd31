//! Kaho dispatcher: fans one entry out to every enabled sink.
//!
//! Sinks run sequentially in registration order and the first failure stops
//! the dispatch. The dispatcher never terminates the process itself; a `FATAL`
//! entry is reported back as `Delivery::Terminate` (on success and on error)
//! and the top-level caller decides how to exit.

use crate::domain::{LogEntry, Severity};
use crate::error::KahoError;
use crate::port::{KeyValuePool, RelationalPool, Sink};
use crate::sink::{CappedBufferSink, ConsoleSink, DurableSink};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Which sinks are active. Read once at startup, never changed afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkFlags {
    pub print_to_console: bool,
    pub broadcast_on_write: bool,
    pub store_in_relational_db: bool,
    pub store_in_capped_buffer: bool,
}

impl SinkFlags {
    pub fn needs_relational(&self) -> bool {
        self.store_in_relational_db
    }

    pub fn needs_key_value(&self) -> bool {
        self.store_in_capped_buffer || (self.store_in_relational_db && self.broadcast_on_write)
    }
}

/// What the caller must do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Continue,
    /// A `FATAL` entry was dispatched; the process should exit non-zero.
    Terminate,
}

impl Delivery {
    #[must_use]
    pub fn for_severity(severity: Severity) -> Self {
        if severity.is_fatal() {
            Delivery::Terminate
        } else {
            Delivery::Continue
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Delivery::Terminate)
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct DispatchError {
    /// Still `Terminate` for a `FATAL` entry even though delivery failed.
    pub delivery: Delivery,
    /// `encode` or the name of the failing sink.
    pub stage: &'static str,
    pub source: KahoError,
}

pub struct Kaho {
    sinks: Vec<Arc<dyn Sink>>,
    flags: SinkFlags,
}

impl Kaho {
    /// Build a dispatcher over an explicit sink list.
    ///
    /// No flags are recorded for such a dispatcher: `flags()` reports every
    /// sink off. Use `from_flags` when the flags must describe the sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            flags: SinkFlags::default(),
        }
    }

    /// Build the sinks selected by `flags`.
    ///
    /// The durable sink needs its table; if creating it fails the sink is left
    /// out with a warning and the returned dispatcher reports the flag as off.
    /// A flag whose store handle is missing is treated the same way.
    pub async fn from_flags(
        flags: SinkFlags,
        relational: Option<Arc<dyn RelationalPool>>,
        key_value: Option<Arc<dyn KeyValuePool>>,
    ) -> Self {
        let mut effective = flags;
        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

        if flags.print_to_console {
            sinks.push(Arc::new(ConsoleSink::new()));
        }

        if flags.store_in_relational_db {
            match &relational {
                Some(pool) => match DurableSink::initialize(pool.as_ref()).await {
                    Ok(()) => {
                        let mut durable = DurableSink::new(Arc::clone(pool));
                        match (&key_value, flags.broadcast_on_write) {
                            (Some(key_value), true) => {
                                durable = durable.with_broadcast(Arc::clone(key_value));
                            }
                            (None, true) => {
                                warn!("[KAHO] broadcast requested without a key-value store, disabled");
                                effective.broadcast_on_write = false;
                            }
                            _ => {}
                        }
                        sinks.push(Arc::new(durable));
                    }
                    Err(e) => {
                        warn!("[SQL][ERROR] unable to create table 'kaho.entries': {e}");
                        effective.store_in_relational_db = false;
                        effective.broadcast_on_write = false;
                    }
                },
                None => {
                    warn!("[KAHO] relational storage requested without a pool, disabled");
                    effective.store_in_relational_db = false;
                    effective.broadcast_on_write = false;
                }
            }
        } else {
            // Broadcast only rides on durable inserts.
            effective.broadcast_on_write = false;
        }

        if flags.store_in_capped_buffer {
            match &key_value {
                Some(pool) => sinks.push(Arc::new(CappedBufferSink::new(Arc::clone(pool)))),
                None => {
                    warn!("[KAHO] capped buffer requested without a key-value store, disabled");
                    effective.store_in_capped_buffer = false;
                }
            }
        }

        let kaho = Self {
            sinks,
            flags: effective,
        };
        info!("[KAHO] active sinks: {:?}", kaho.sink_names());
        kaho
    }

    /// Flags as they ended up after startup degradation. All off for a
    /// dispatcher built with `new`.
    pub fn flags(&self) -> SinkFlags {
        self.flags
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Deliver `entry` to every active sink.
    ///
    /// The payload is encoded before any sink runs, so an unencodable payload
    /// fails without touching a store.
    pub async fn log_raw(&self, entry: &LogEntry) -> Result<Delivery, DispatchError> {
        let delivery = Delivery::for_severity(entry.severity());

        let encoded = entry.encode().map_err(|source| DispatchError {
            delivery,
            stage: "encode",
            source,
        })?;

        for sink in &self.sinks {
            sink.deliver(&encoded)
                .await
                .map_err(|source| DispatchError {
                    delivery,
                    stage: sink.name(),
                    source,
                })?;
        }

        Ok(delivery)
    }

    /// Fire-and-forget convenience over `log_raw`.
    ///
    /// Delivery errors are only reported on the process log; use `log_raw`
    /// when delivery must be checked. The fatal signal is always returned.
    pub async fn log(
        &self,
        severity: Severity,
        service: &str,
        message: &str,
        payload: Option<Value>,
    ) -> Delivery {
        let mut entry = LogEntry::new(severity, service, message);
        if let Some(payload) = payload {
            entry = entry.with_payload(payload);
        }

        match self.log_raw(&entry).await {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!("[KAHO] failed to deliver entry from {service}: {e}");
                e.delivery
            }
        }
    }
}
