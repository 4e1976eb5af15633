use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Row as _};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::query_builder::{bind_param, bind_row, QueryBuilder};
use super::{DatabaseError, Link, Row, Store, Table};
use crate::config::DatabaseConfig;
use crate::filter::Filter;
use crate::policy::Scope;

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", config.display_url());
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn row_object(row: &PgRow) -> Result<Row, DatabaseError> {
        let value: Value = row.try_get("row")?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(DatabaseError::Decode(format!("expected JSON object, got {}", other))),
        }
    }

    fn map_write_error(table: Table, err: sqlx::Error) -> DatabaseError {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default();
            match db.code().as_deref() {
                // unique_violation, constraint names look like "subjects_code_key"
                Some("23505") => {
                    let column = constraint
                        .strip_prefix(&format!("{}_", table.name()))
                        .and_then(|c| c.strip_suffix("_key"))
                        .unwrap_or(constraint);
                    return DatabaseError::Conflict(format!("A record with this {} already exists", column));
                }
                // foreign_key_violation
                Some("23503") => {
                    return DatabaseError::InvalidReference(format!("{} references a missing record", constraint));
                }
                _ => {}
            }
        }
        DatabaseError::Sqlx(err)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, filter: &Filter) -> Result<Vec<Row>, DatabaseError> {
        let sql = QueryBuilder::select(filter);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_object).collect()
    }

    async fn select_id(&self, table: Table, id: Uuid) -> Result<Option<Row>, DatabaseError> {
        let sql = QueryBuilder::select_id(table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_object).transpose()
    }

    async fn count(&self, table: Table, scope: &Scope) -> Result<i64, DatabaseError> {
        let sql = Filter::new(table).with_scope(scope.clone()).to_count_sql();
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        let sql = QueryBuilder::insert(table);
        let inserted = bind_row(sqlx::query(&sql), Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(table, e))?;
        Self::row_object(&inserted)
    }

    async fn update(&self, table: Table, id: Uuid, row: Row) -> Result<Row, DatabaseError> {
        let sql = QueryBuilder::update(table);
        let updated = bind_row(sqlx::query(&sql).bind(id), Value::Object(row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(table, e))?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", table.name(), id)))?;
        Self::row_object(&updated)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&QueryBuilder::delete(table)).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn link(&self, link: Link, record: Uuid, user: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(&QueryBuilder::link(link))
            .bind(record)
            .bind(user)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(link.record_table(), e))?;
        Ok(())
    }

    async fn unlink(&self, link: Link, record: Uuid, user: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&QueryBuilder::unlink(link))
            .bind(record)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn linked_records(&self, link: Link, user: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let rows = sqlx::query(&QueryBuilder::linked_records(link)).bind(user).fetch_all(&self.pool).await?;
        rows.iter().map(|r| r.try_get::<Uuid, _>("id").map_err(DatabaseError::from)).collect()
    }

    async fn linked_users(&self, link: Link, record: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let rows = sqlx::query(&QueryBuilder::linked_users(link)).bind(record).fetch_all(&self.pool).await?;
        rows.iter().map(|r| r.try_get::<Uuid, _>("id").map_err(DatabaseError::from)).collect()
    }

    async fn migrate(&self) -> Result<(), DatabaseError> {
        // a plain &str runs as a simple query, so the multi-statement file is fine
        self.pool.execute(SCHEMA_SQL).await?;
        info!("Applied schema ({} tables)", Table::ALL.len() + Link::ALL.len());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
