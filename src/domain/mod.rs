pub mod log_entry;
pub mod severity;

pub use log_entry::{EncodedEntry, LogEntry, Payload, StoredEntry};
pub use severity::Severity;
