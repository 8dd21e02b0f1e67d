use async_trait::async_trait;
use serde_json::Value;

use crate::database::manager::DatabaseError;
use crate::filter::Filter;

/// Read access to the remote row store.
///
/// Rows come back as JSON objects keyed by column name, restricted to the
/// filter's selected columns when it names any.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;

    /// Exact row count, no rows transferred
    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError>;
}
