use crate::adapter::{PostgresPool, RedisPool};
use crate::config::Settings;
use crate::dispatcher::Kaho;
use crate::error::KahoError;
use crate::port::{KeyValuePool, RelationalPool};
use crate::proxy::TrustedProxies;
use std::sync::Arc;
use tracing::error;

/// Shared state handed to the request-logging middleware.
#[derive(Clone)]
pub struct AppState {
    pub kaho: Arc<Kaho>,
    pub proxies: Arc<TrustedProxies>,
}

impl AppState {
    #[must_use]
    pub fn new(kaho: Arc<Kaho>, proxies: TrustedProxies) -> Self {
        Self {
            kaho,
            proxies: Arc::new(proxies),
        }
    }
}

/// Open the store pools the enabled flags need and build the dispatcher.
///
/// A pool that cannot be created or pinged fails startup.
pub async fn build_kaho(settings: &Settings) -> Result<Kaho, KahoError> {
    let flags = settings.flags;

    let relational: Option<Arc<dyn RelationalPool>> = if flags.needs_relational() {
        let pool = PostgresPool::connect(&settings.postgres)
            .await
            .inspect_err(|e| error!("[SQL][ERROR] unable to create postgres pool: {e}"))?;
        Some(Arc::new(pool))
    } else {
        None
    };

    let key_value: Option<Arc<dyn KeyValuePool>> = if flags.needs_key_value() {
        let pool = RedisPool::connect(&settings.redis)
            .await
            .inspect_err(|e| error!("[RDB][ERROR] unable to create redis pool: {e}"))?;
        Some(Arc::new(pool))
    } else {
        None
    };

    Ok(Kaho::from_flags(flags, relational, key_value).await)
}
