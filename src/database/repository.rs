use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Table;
use crate::database::store::RowStore;
use crate::filter::{Filter, Predicate};

/// Typed reads over one table of a `RowStore`
pub struct Repository<'a, T> {
    store: &'a dyn RowStore,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> Repository<'a, T>
where
    T: Table + DeserializeOwned,
{
    pub fn new(store: &'a dyn RowStore) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Empty filter over this repository's table
    pub fn filter(&self) -> Result<Filter, DatabaseError> {
        Ok(Filter::new(T::TABLE)?)
    }

    pub async fn select_any(&self, filter: Filter) -> Result<Vec<T>, DatabaseError> {
        let rows = self.store.select(&filter).await?;
        rows.into_iter().map(Self::decode).collect()
    }

    pub async fn count(&self, filter: Filter) -> Result<i64, DatabaseError> {
        self.store.count(&filter).await
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let filter = self.filter()?.with(Predicate::in_list("id", ids.iter().map(|id| id.to_string())));
        self.select_any(filter).await
    }

    fn decode(row: serde_json::Value) -> Result<T, DatabaseError> {
        serde_json::from_value(row).map_err(|source| DatabaseError::Decode {
            table: T::TABLE.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::College;

    #[tokio::test]
    async fn decodes_rows_and_reports_bad_ones() {
        let store = MemoryStore::new();
        let college = College { id: Uuid::new_v4(), name: "Engineering".into(), code: "01".into() };
        store.insert(College::TABLE, &college).await.unwrap();

        let repo = Repository::<College>::new(&store);
        assert_eq!(repo.select_ids(&[college.id]).await.unwrap(), vec![college.clone()]);
        assert_eq!(repo.count(repo.filter().unwrap()).await.unwrap(), 1);
        assert!(repo.select_ids(&[]).await.unwrap().is_empty());

        store.insert(College::TABLE, &serde_json::json!({ "id": "not-a-uuid" })).await.unwrap();
        let err = repo.select_any(repo.filter().unwrap()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Decode { .. }));
    }
}
