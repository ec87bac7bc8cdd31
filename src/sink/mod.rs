pub mod capped_buffer;
pub mod console;
pub mod durable;

use crate::error::KahoError;
use std::future::Future;
use std::time::Duration;

pub use capped_buffer::CappedBufferSink;
pub use console::{CONSOLE_TARGET, ConsoleSink};
pub use durable::DurableSink;

/// Upper bound for every single remote operation a sink performs.
pub const STORE_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run one remote step under `STORE_OPERATION_TIMEOUT`.
///
/// Expiry is reported as a delivery failure; nothing is retried.
pub(crate) async fn bounded<T, F>(operation: &'static str, step: F) -> Result<T, KahoError>
where
    F: Future<Output = Result<T, KahoError>>,
{
    match tokio::time::timeout(STORE_OPERATION_TIMEOUT, step).await {
        Ok(result) => result,
        Err(_) => Err(KahoError::Timeout {
            operation,
            seconds: STORE_OPERATION_TIMEOUT.as_secs(),
        }),
    }
}
