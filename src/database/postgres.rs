use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Row};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::DatabaseError;
use crate::database::store::RowStore;
use crate::filter::Filter;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// `RowStore` backed by a Postgres pool
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
    log_queries: bool,
    slow_query_threshold: Duration,
}

impl PgRowStore {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            log_queries: config.enable_query_logging,
            slow_query_threshold: Duration::from_millis(config.slow_query_threshold_ms),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn observe(&self, query: &str, started: Instant) {
        let elapsed = started.elapsed();
        if self.log_queries {
            tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "{}", query);
        }
        if elapsed > self.slow_query_threshold {
            tracing::warn!("Slow query ({} ms): {}", elapsed.as_millis(), query);
        }
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let sql_result = filter.to_record_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }

        let started = Instant::now();
        let rows = q.fetch_all(&self.pool).await?;
        self.observe(&sql_result.query, started);

        rows.iter()
            .map(|row| row.try_get::<Value, _>("record").map_err(DatabaseError::from))
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let sql_result = filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }

        let started = Instant::now();
        let row = q.fetch_one(&self.pool).await?;
        self.observe(&sql_result.query, started);

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

/// How a string parameter is bound. UUID-shaped and RFC 3339 strings get their
/// native types so they compare against `uuid` and `timestamptz` columns
/// without casts.
#[derive(Debug, PartialEq)]
enum TextParam {
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text,
}

impl TextParam {
    fn classify(s: &str) -> Self {
        if let Ok(id) = Uuid::parse_str(s) {
            TextParam::Uuid(id)
        } else if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            TextParam::Timestamp(ts.with_timezone(&Utc))
        } else {
            TextParam::Text
        }
    }
}

/// Binds one filter parameter
fn bind_param_query<'q>(q: PgQuery<'q>, v: &Value) -> PgQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => match TextParam::classify(s) {
            TextParam::Uuid(id) => q.bind(id),
            TextParam::Timestamp(ts) => q.bind(ts),
            TextParam::Text => q.bind(s.clone()),
        },
        // Arrays are expanded into individual parameters by FilterWhere
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}
