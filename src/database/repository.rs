use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::models::Entity;
use super::{DatabaseError, Row, Store};
use crate::filter::Filter;
use crate::policy::Scope;

/// Typed access to one table, converting between JSON rows and models
pub struct Repository<T: Entity> {
    store: Arc<dyn Store>,
    _entity: PhantomData<T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, _entity: PhantomData }
    }

    fn decode(row: Row) -> Result<T, DatabaseError> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| DatabaseError::Decode(format!("{}: {}", T::TABLE.name(), e)))
    }

    fn encode(record: &T) -> Result<Row, DatabaseError> {
        match serde_json::to_value(record) {
            Ok(Value::Object(row)) => Ok(row),
            Ok(other) => Err(DatabaseError::Decode(format!("expected JSON object, got {}", other))),
            Err(e) => Err(DatabaseError::Decode(e.to_string())),
        }
    }

    /// Records matching the filter; the filter must target `T::TABLE`
    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        if filter.table() != T::TABLE {
            return Err(DatabaseError::QueryError(format!(
                "filter on {} used for {}",
                filter.table().name(),
                T::TABLE.name()
            )));
        }
        self.store.select(filter).await?.into_iter().map(Self::decode).collect()
    }

    /// Unscoped, default-ordered listing
    pub async fn select_all(&self) -> Result<Vec<T>, DatabaseError> {
        self.select_any(&Filter::new(T::TABLE)).await
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        self.store.select_id(T::TABLE, id).await?.map(Self::decode).transpose()
    }

    /// Like [`Repository::select_one`], but a missing row is an error
    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", T::TABLE.name(), id)))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.store.select_id(T::TABLE, id).await?.is_some())
    }

    pub async fn count(&self, scope: &Scope) -> Result<i64, DatabaseError> {
        self.store.count(T::TABLE, scope).await
    }

    pub async fn create(&self, record: &T) -> Result<T, DatabaseError> {
        let row = self.store.insert(T::TABLE, Self::encode(record)?).await?;
        Self::decode(row)
    }

    pub async fn update(&self, record: &T) -> Result<T, DatabaseError> {
        let row = self.store.update(T::TABLE, record.id(), Self::encode(record)?).await?;
        Self::decode(row)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        if self.store.delete(T::TABLE, id).await? {
            Ok(())
        } else {
            Err(DatabaseError::NotFound(format!("{} {} not found", T::TABLE.name(), id)))
        }
    }
}
