//! Shared test support utilities
//!
//! In-memory stand-ins for the relational and key-value pools. Both record
//! every call (optionally into one shared `CallLog` so cross-store ordering can
//! be asserted) and emulate just enough store semantics for the sinks.

use crate::error::KahoError;
use crate::port::{KeyValuePool, KvReply, PortFuture, RelationalPool, SqlRow, SqlValue};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Ordered record of store calls, labelled `sql:<VERB>` or `kv:<COMMAND>`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn entries(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    fn push(&self, label: String) {
        lock(&self.0).push(label);
    }
}

#[derive(Debug, Clone)]
pub struct RelationalCall {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Relational pool backed by a vector of rows.
///
/// `INSERT` statements append a row and return its id, `SELECT` statements
/// look a row up by the id in the first parameter.
#[derive(Default)]
pub struct StubRelationalPool {
    log: CallLog,
    calls: Mutex<Vec<RelationalCall>>,
    rows: Mutex<Vec<SqlRow>>,
    should_fail: AtomicBool,
    hang: AtomicBool,
}

impl StubRelationalPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Make every call wait forever (for timeout tests).
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RelationalCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, sql: &str, params: &[SqlValue]) -> String {
        let verb = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        self.log.push(format!("sql:{verb}"));
        lock(&self.calls).push(RelationalCall {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        verb
    }

    fn run(&self, verb: &str, params: Vec<SqlValue>) -> Result<Vec<SqlRow>, KahoError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(KahoError::Relational(sqlx::Error::PoolTimedOut));
        }

        let mut rows = lock(&self.rows);
        match verb {
            "INSERT" => {
                let id = i64::try_from(rows.len()).unwrap_or(i64::MAX) + 1;
                let mut row = vec![
                    SqlValue::Int(id),
                    SqlValue::Timestamp(Utc::now().naive_utc()),
                ];
                row.extend(params);
                rows.push(row);
                Ok(vec![vec![SqlValue::Int(id)]])
            }
            "SELECT" => {
                let wanted = params.first().and_then(SqlValue::as_int);
                Ok(rows
                    .iter()
                    .filter(|row| row.first().and_then(SqlValue::as_int) == wanted)
                    .cloned()
                    .collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn hang_if_requested(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

impl RelationalPool for StubRelationalPool {
    fn execute<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, u64> {
        let verb = self.record(sql, &params);
        Box::pin(async move {
            self.hang_if_requested().await;
            let rows = self.run(&verb, params)?;
            Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, Vec<SqlRow>> {
        let verb = self.record(sql, &params);
        Box::pin(async move {
            self.hang_if_requested().await;
            self.run(&verb, params)
        })
    }
}

/// Key-value pool emulating lists and publish for the commands Kaho issues.
#[derive(Default)]
pub struct StubKeyValuePool {
    log: CallLog,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    published: Mutex<Vec<(String, String)>>,
    fail_on: Mutex<Option<String>>,
    hang_on: Mutex<Option<String>>,
}

impl StubKeyValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Fail every subsequent call of `command` with a transport error.
    pub fn fail_on(&self, command: &str) {
        *lock(&self.fail_on) = Some(command.to_ascii_uppercase());
    }

    /// Never answer subsequent calls of `command` (for timeout tests).
    pub fn hang_on(&self, command: &str) {
        *lock(&self.hang_on) = Some(command.to_ascii_uppercase());
    }

    pub fn clear_failure(&self) {
        *lock(&self.fail_on) = None;
        *lock(&self.hang_on) = None;
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.calls).clone()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        lock(&self.published).clone()
    }

    pub fn list_len(&self, key: &str) -> usize {
        lock(&self.lists).get(key).map_or(0, VecDeque::len)
    }

    pub fn list_item(&self, key: &str, index: usize) -> Option<String> {
        lock(&self.lists)
            .get(key)
            .and_then(|list| list.get(index).cloned())
    }

    fn run(&self, name: &str, args: Vec<String>) -> Result<KvReply, KahoError> {
        if lock(&self.fail_on).as_deref() == Some(name) {
            return Err(KahoError::KeyValue(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "stub connection failure",
            ))));
        }

        let mut args = args.into_iter();
        let key = args.next().unwrap_or_default();
        match name {
            "LPUSH" => {
                let mut lists = lock(&self.lists);
                let list = lists.entry(key).or_default();
                for value in args {
                    list.push_front(value);
                }
                Ok(KvReply::Int(i64::try_from(list.len()).unwrap_or(i64::MAX)))
            }
            "LTRIM" => {
                let (start, stop) = parse_range(args)?;
                let mut lists = lock(&self.lists);
                if let Some(list) = lists.get_mut(&key) {
                    match list_range(list.len(), start, stop) {
                        Some((from, to)) => {
                            list.truncate(to + 1);
                            list.drain(..from);
                        }
                        None => list.clear(),
                    }
                }
                Ok(KvReply::Ok)
            }
            "LRANGE" => {
                let (start, stop) = parse_range(args)?;
                let lists = lock(&self.lists);
                let items = lists
                    .get(&key)
                    .and_then(|list| {
                        list_range(list.len(), start, stop)
                            .map(|(from, to)| list.range(from..=to).cloned().collect::<Vec<_>>())
                    })
                    .unwrap_or_default();
                Ok(KvReply::Array(items.into_iter().map(KvReply::Text).collect()))
            }
            "PUBLISH" => {
                let message = args.next().unwrap_or_default();
                lock(&self.published).push((key, message));
                Ok(KvReply::Int(0))
            }
            "PING" => Ok(KvReply::Text("PONG".to_string())),
            other => Err(KahoError::UnexpectedReply {
                operation: "stub command",
                detail: format!("unsupported command {other}"),
            }),
        }
    }
}

impl KeyValuePool for StubKeyValuePool {
    fn command<'a>(&'a self, name: &'a str, args: Vec<String>) -> PortFuture<'a, KvReply> {
        let name = name.to_ascii_uppercase();
        self.log.push(format!("kv:{name}"));
        lock(&self.calls).push((name.clone(), args.clone()));
        let hang = lock(&self.hang_on).as_deref() == Some(name.as_str());
        Box::pin(async move {
            if hang {
                std::future::pending::<()>().await;
            }
            self.run(&name, args)
        })
    }
}

fn parse_range(mut args: impl Iterator<Item = String>) -> Result<(i64, i64), KahoError> {
    let mut next = || {
        args.next()
            .and_then(|arg| arg.parse::<i64>().ok())
            .ok_or_else(|| KahoError::UnexpectedReply {
                operation: "stub command",
                detail: "range bounds must be integers".to_string(),
            })
    };
    Ok((next()?, next()?))
}

/// Inclusive bounds with negative indexes counted from the tail.
fn list_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let normalize = |index: i64| if index < 0 { len + index } else { index };
    let start = normalize(start).max(0);
    let stop = normalize(stop).min(len - 1);
    if len == 0 || start > stop {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}
