//! SQL statements for [`PgStore`](super::PgStore).
//!
//! Rows travel as JSON in both directions: reads wrap the statement in
//! `row_to_json`, writes go through `jsonb_populate_record` so Postgres does
//! the column typing.

use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use super::{Link, Table};
use crate::filter::{Filter, SqlParam, SqlResult};

pub struct QueryBuilder;

impl QueryBuilder {
    pub fn select(filter: &Filter) -> SqlResult {
        let inner = filter.to_sql();
        SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        }
    }

    pub fn select_id(table: Table) -> String {
        format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE \"id\" = $1) t",
            table.name()
        )
    }

    pub fn insert(table: Table) -> String {
        let name = table.name();
        format!(
            "INSERT INTO \"{name}\" SELECT * FROM jsonb_populate_record(NULL::\"{name}\", $1) \
             RETURNING row_to_json(\"{name}\".*) AS row"
        )
    }

    /// Every column except `id` and `created_at` is replaced from `$2`
    pub fn update(table: Table) -> String {
        let name = table.name();
        let columns = table
            .columns()
            .iter()
            .filter(|c| !matches!(**c, "id" | "created_at"))
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE \"{name}\" SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::\"{name}\", $2)) \
             WHERE \"id\" = $1 RETURNING row_to_json(\"{name}\".*) AS row"
        )
    }

    pub fn delete(table: Table) -> String {
        format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table.name())
    }

    pub fn link(link: Link) -> String {
        format!(
            "INSERT INTO \"{}\" (\"{}\", \"user_id\") VALUES ($1, $2) ON CONFLICT DO NOTHING",
            link.name(),
            link.record_column()
        )
    }

    pub fn unlink(link: Link) -> String {
        format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1 AND \"user_id\" = $2",
            link.name(),
            link.record_column()
        )
    }

    pub fn linked_records(link: Link) -> String {
        format!(
            "SELECT \"{col}\" AS id FROM \"{}\" WHERE \"user_id\" = $1 ORDER BY \"created_at\", \"{col}\"",
            link.name(),
            col = link.record_column()
        )
    }

    pub fn linked_users(link: Link) -> String {
        format!(
            "SELECT \"user_id\" AS id FROM \"{}\" WHERE \"{}\" = $1 ORDER BY \"created_at\", \"user_id\"",
            link.name(),
            link.record_column()
        )
    }
}

pub fn bind_param<'q>(q: Query<'q, Postgres, PgArguments>, p: &SqlParam) -> Query<'q, Postgres, PgArguments> {
    match p {
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Uuids(ids) => q.bind(ids.clone()),
        SqlParam::Text(s) => q.bind(s.clone()),
    }
}

pub fn bind_row<'q>(q: Query<'q, Postgres, PgArguments>, row: Value) -> Query<'q, Postgres, PgArguments> {
    q.bind(sqlx::types::Json(row))
}
