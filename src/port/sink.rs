use super::PortFuture;
use crate::domain::EncodedEntry;

/// Delivery target for an encoded entry (console, durable store, capped buffer).
///
/// Implementations perform their remote calls inline and bound each of them
/// with a timeout. A returned error stops the dispatch.
pub trait Sink: Send + Sync {
    /// Short label used in dispatch errors and startup logs.
    fn name(&self) -> &'static str;

    fn deliver<'a>(&'a self, entry: &'a EncodedEntry) -> PortFuture<'a, ()>;
}
