use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DatabaseError, Link, OnDelete, Row, Store, Table};
use crate::filter::{Filter, FilterOrderInfo, SortDirection};
use crate::policy::Scope;

/// In-process [`Store`] with the same contract as the Postgres store:
/// unique columns, delete cascades and link sets. Rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Row>>,
    links: HashMap<Link, Vec<(Uuid, Uuid)>>,
}

fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

fn references_id(value: Option<&Value>, id: Uuid) -> bool {
    value
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .is_some_and(|v| v == id)
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Postgres-like ordering of JSON column values; nulls sort last ascending
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn compare_rows(a: &Row, b: &Row, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let ord = compare_values(
            a.get(info.column).unwrap_or(&Value::Null),
            b.get(info.column).unwrap_or(&Value::Null),
        );
        let ord = match info.sort {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Inner {
    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn check_unique(&self, table: Table, row: &Row, except: Option<Uuid>) -> Result<(), DatabaseError> {
        for column in table.unique_columns() {
            let Some(value) = row.get(*column).filter(|v| !v.is_null()) else { continue };
            let taken = self
                .rows(table)
                .iter()
                .filter(|r| except.is_none() || row_id(r) != except)
                .any(|r| r.get(*column) == Some(value));
            if taken {
                return Err(DatabaseError::Conflict(format!("A record with this {} already exists", column)));
            }
        }
        Ok(())
    }

    fn delete_row(&mut self, table: Table, id: Uuid) -> bool {
        let rows = self.tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return false;
        }

        for reference in table.referenced_by() {
            match reference.on_delete {
                OnDelete::SetNull => {
                    for row in self.tables.entry(reference.table).or_default().iter_mut() {
                        if references_id(row.get(reference.column), id) {
                            row.insert(reference.column.to_string(), Value::Null);
                        }
                    }
                }
                OnDelete::Cascade => {
                    let dependents: Vec<Uuid> = self
                        .rows(reference.table)
                        .iter()
                        .filter(|r| references_id(r.get(reference.column), id))
                        .filter_map(row_id)
                        .collect();
                    for dependent in dependents {
                        self.delete_row(reference.table, dependent);
                    }
                }
            }
        }

        for link in Link::ALL {
            let pairs = self.links.entry(link).or_default();
            if link.record_table() == table {
                pairs.retain(|(record, _)| *record != id);
            } else if table == Table::Users {
                pairs.retain(|(_, user)| *user != id);
            }
        }
        true
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, filter: &Filter) -> Result<Vec<Row>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Row> = inner
            .rows(filter.table())
            .iter()
            .filter(|r| filter.scope().matches(r))
            .cloned()
            .collect();

        // without an explicit order, insertion order stands in for created_at
        if !filter.explicit_order().is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, filter.explicit_order()));
        }

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn select_id(&self, table: Table, id: Uuid) -> Result<Option<Row>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.rows(table).iter().find(|r| row_id(r) == Some(id)).cloned())
    }

    async fn count(&self, table: Table, scope: &Scope) -> Result<i64, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.rows(table).iter().filter(|r| scope.matches(r)).count() as i64)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        let id = row_id(&row).ok_or_else(|| DatabaseError::QueryError("row has no id".to_string()))?;
        let mut inner = self.inner.write().await;
        if inner.rows(table).iter().any(|r| row_id(r) == Some(id)) {
            return Err(DatabaseError::Conflict(format!("{} {} already exists", table.name(), id)));
        }
        inner.check_unique(table, &row, None)?;
        inner.tables.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: Uuid, mut row: Row) -> Result<Row, DatabaseError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(table, &row, Some(id))?;
        let existing = inner
            .tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| row_id(r) == Some(id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", table.name(), id)))?;

        for column in ["id", "created_at"] {
            if let Some(v) = existing.get(column) {
                row.insert(column.to_string(), v.clone());
            }
        }
        *existing = row.clone();
        Ok(row)
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, DatabaseError> {
        let mut inner = self.inner.write().await;
        Ok(inner.delete_row(table, id))
    }

    async fn link(&self, link: Link, record: Uuid, user: Uuid) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let record_exists = inner.rows(link.record_table()).iter().any(|r| row_id(r) == Some(record));
        let user_exists = inner.rows(Table::Users).iter().any(|r| row_id(r) == Some(user));
        if !record_exists || !user_exists {
            return Err(DatabaseError::InvalidReference(format!("{} references a missing record", link.name())));
        }
        let pairs = inner.links.entry(link).or_default();
        if !pairs.contains(&(record, user)) {
            pairs.push((record, user));
        }
        Ok(())
    }

    async fn unlink(&self, link: Link, record: Uuid, user: Uuid) -> Result<bool, DatabaseError> {
        let mut inner = self.inner.write().await;
        let pairs = inner.links.entry(link).or_default();
        let before = pairs.len();
        pairs.retain(|pair| *pair != (record, user));
        Ok(pairs.len() != before)
    }

    async fn linked_records(&self, link: Link, user: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .get(&link)
            .map(|pairs| pairs.iter().filter(|(_, u)| *u == user).map(|(r, _)| *r).collect())
            .unwrap_or_default())
    }

    async fn linked_users(&self, link: Link, record: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .links
            .get(&link)
            .map(|pairs| pairs.iter().filter(|(r, _)| *r == record).map(|(_, u)| *u).collect())
            .unwrap_or_default())
    }

    async fn migrate(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
