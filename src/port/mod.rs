pub mod key_value;
pub mod relational;
pub mod sink;

use crate::error::KahoError;
use std::future::Future;
use std::pin::Pin;

pub use key_value::{KeyValuePool, KvReply};
pub use relational::{RelationalPool, SqlRow, SqlValue};
pub use sink::Sink;

/// Boxed future returned by every port so the traits stay dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, KahoError>> + Send + 'a>>;
