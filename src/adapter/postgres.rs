use crate::config::PostgresSettings;
use crate::error::KahoError;
use crate::port::{PortFuture, RelationalPool, SqlRow, SqlValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row, TypeInfo};
use std::time::Duration;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Postgres pool exposed through the `RelationalPool` port.
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a fixed-size pool and verify it with a ping.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self, KahoError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.pool_size)
            .min_connections(settings.pool_size)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&settings.url);
        let pool = tokio::time::timeout(CONNECT_TIMEOUT, pool)
            .await
            .map_err(|_| KahoError::Timeout {
                operation: "connect postgres pool",
                seconds: CONNECT_TIMEOUT.as_secs(),
            })??;

        let ping = sqlx::query("SELECT 1").execute(&pool);
        tokio::time::timeout(PING_TIMEOUT, ping)
            .await
            .map_err(|_| KahoError::Timeout {
                operation: "ping postgres",
                seconds: PING_TIMEOUT.as_secs(),
            })??;

        info!("[SQL][INFO] Created Pool with {} Client(s)", settings.pool_size);
        Ok(Self::new(pool))
    }
}

fn build_query(
    sql: &str,
    params: Vec<SqlValue>,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    params
        .into_iter()
        .fold(sqlx::query(sql), |query, param| match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Int(value) => query.bind(value),
            SqlValue::Text(value) => query.bind(value),
            SqlValue::Timestamp(value) => query.bind(value),
        })
}

fn decode_row(row: &PgRow) -> Result<SqlRow, KahoError> {
    row.columns()
        .iter()
        .map(|column| -> Result<SqlValue, KahoError> {
            let index = column.ordinal();
            let value = match column.type_info().name() {
                "INT2" => row
                    .try_get::<Option<i16>, _>(index)?
                    .map(|v| SqlValue::Int(v.into())),
                "INT4" => row
                    .try_get::<Option<i32>, _>(index)?
                    .map(|v| SqlValue::Int(v.into())),
                "INT8" => row.try_get::<Option<i64>, _>(index)?.map(SqlValue::Int),
                "TIMESTAMP" => row
                    .try_get::<Option<NaiveDateTime>, _>(index)?
                    .map(SqlValue::Timestamp),
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(index)?
                    .map(|at| SqlValue::Timestamp(at.naive_utc())),
                _ => row.try_get::<Option<String>, _>(index)?.map(SqlValue::Text),
            };
            Ok(value.unwrap_or(SqlValue::Null))
        })
        .collect()
}

impl RelationalPool for PostgresPool {
    fn execute<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, u64> {
        Box::pin(async move {
            // Parameterless text may carry several statements (schema setup),
            // which only the simple query protocol accepts.
            let result = if params.is_empty() {
                sqlx::raw_sql(sql).execute(&self.pool).await?
            } else {
                build_query(sql, params).execute(&self.pool).await?
            };
            Ok(result.rows_affected())
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: Vec<SqlValue>) -> PortFuture<'a, Vec<SqlRow>> {
        Box::pin(async move {
            let rows = build_query(sql, params).fetch_all(&self.pool).await?;
            rows.iter().map(decode_row).collect()
        })
    }
}
