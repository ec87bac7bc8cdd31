use crate::config::RedisSettings;
use crate::error::KahoError;
use crate::port::{KeyValuePool, KvReply, PortFuture};
use ::redis::aio::ConnectionManager;
use ::redis::{IntoConnectionInfo, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed set of multiplexed Redis connections handed out round-robin.
pub struct RedisPool {
    connections: Vec<ConnectionManager>,
    next: AtomicUsize,
}

impl RedisPool {
    /// Open `pool_size` connections and verify them with a `PING`.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, KahoError> {
        let mut connection_info = format!("redis://{}", settings.addr).into_connection_info()?;
        connection_info.redis.password = settings.password.clone();
        let client = ::redis::Client::open(connection_info)?;

        let size = usize::try_from(settings.pool_size).unwrap_or(1);
        let open_all = async {
            let mut connections = Vec::with_capacity(size);
            for _ in 0..size {
                connections.push(ConnectionManager::new(client.clone()).await?);
            }
            Ok::<_, KahoError>(connections)
        };
        let connections = tokio::time::timeout(CONNECT_TIMEOUT, open_all)
            .await
            .map_err(|_| KahoError::Timeout {
                operation: "connect redis pool",
                seconds: CONNECT_TIMEOUT.as_secs(),
            })??;

        let pool = Self {
            connections,
            next: AtomicUsize::new(0),
        };

        let pong = tokio::time::timeout(PING_TIMEOUT, pool.command("PING", Vec::new()))
            .await
            .map_err(|_| KahoError::Timeout {
                operation: "ping redis",
                seconds: PING_TIMEOUT.as_secs(),
            })??;
        if pong != KvReply::Text("PONG".to_string()) {
            return Err(KahoError::UnexpectedReply {
                operation: "PING",
                detail: format!("{pong:?}"),
            });
        }

        info!("[RDB][INFO] Created Pool with {} Client(s)", settings.pool_size);
        Ok(pool)
    }

    fn connection(&self) -> Result<ConnectionManager, KahoError> {
        if self.connections.is_empty() {
            return Err(KahoError::Config("redis pool has no connections".into()));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        Ok(self.connections[index].clone())
    }
}

impl KeyValuePool for RedisPool {
    fn command<'a>(&'a self, name: &'a str, args: Vec<String>) -> PortFuture<'a, KvReply> {
        Box::pin(async move {
            let mut connection = self.connection()?;
            let mut command = ::redis::cmd(name);
            for arg in &args {
                command.arg(arg);
            }
            let value: Value = command.query_async(&mut connection).await?;
            Ok(to_reply(value))
        })
    }
}

fn to_reply(value: Value) -> KvReply {
    match value {
        Value::Nil => KvReply::Nil,
        Value::Okay => KvReply::Ok,
        Value::Int(n) => KvReply::Int(n),
        Value::SimpleString(text) if text == "OK" => KvReply::Ok,
        Value::SimpleString(text) => KvReply::Text(text),
        Value::BulkString(bytes) => KvReply::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Array(items) => KvReply::Array(items.into_iter().map(to_reply).collect()),
        other => KvReply::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_map_to_port_shapes() {
        assert_eq!(to_reply(Value::Okay), KvReply::Ok);
        assert_eq!(to_reply(Value::SimpleString("OK".into())), KvReply::Ok);
        assert_eq!(to_reply(Value::SimpleString("PONG".into())), KvReply::Text("PONG".into()));
        assert_eq!(to_reply(Value::Int(3)), KvReply::Int(3));
        assert_eq!(
            to_reply(Value::Array(vec![
                Value::BulkString(b"{\"a\":1}".to_vec()),
                Value::Nil
            ])),
            KvReply::Array(vec![KvReply::Text("{\"a\":1}".into()), KvReply::Nil])
        );
    }
}
