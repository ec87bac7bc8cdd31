//! Narrow contract for the pooled relational store.
//!
//! Production code talks to Postgres through `adapter::postgres::PostgresPool`;
//! tests substitute an in-memory stub that records every call.

use super::PortFuture;
use chrono::NaiveDateTime;

/// Parameter or column value exchanged with the relational store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

pub type SqlRow = Vec<SqlValue>;

pub trait RelationalPool: Send + Sync {
    /// Run a statement and return the number of affected rows.
    ///
    /// With no parameters the text may hold several `;`-separated statements.
    fn execute<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, u64>;

    /// Run a statement and return every resulting row.
    fn query<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, Vec<SqlRow>>;
}
