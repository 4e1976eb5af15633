pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::Repository;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::filter::Filter;
use crate::policy::Scope;

/// A stored row as a JSON object keyed by column name
pub type Row = Map<String, Value>;

/// Errors from a [`Store`]
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Row decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// What happens to referencing rows when a referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// A foreign key pointing at some table: `table.column` references its `id`
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub table: Table,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

const fn reference(table: Table, column: &'static str, on_delete: OnDelete) -> Reference {
    Reference { table, column, on_delete }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Classes,
    Students,
    Teachers,
    Subjects,
    Grades,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Users,
        Table::Classes,
        Table::Students,
        Table::Teachers,
        Table::Subjects,
        Table::Grades,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Classes => "classes",
            Table::Students => "students",
            Table::Teachers => "teachers",
            Table::Subjects => "subjects",
            Table::Grades => "grades",
        }
    }

    /// Column list in table order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Users => &["id", "name", "email", "password_hash", "role", "created_at", "updated_at"],
            Table::Classes => &["id", "name", "teacher_id", "created_by", "created_at", "updated_at"],
            Table::Students => &[
                "id", "admission_no", "name", "class_id", "dob", "gender", "created_by", "created_at", "updated_at",
            ],
            Table::Teachers => &[
                "id", "teacher_no", "name", "email", "phone", "specialization", "created_by", "created_at",
                "updated_at",
            ],
            Table::Subjects => &["id", "name", "code", "description", "created_by", "created_at", "updated_at"],
            Table::Grades => &[
                "id", "student_id", "subject_id", "teacher_id", "score", "max_score", "grade_type", "date_given",
                "created_at", "updated_at",
            ],
        }
    }

    /// Columns whose values must be unique across the table
    pub fn unique_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Users => &["email"],
            Table::Subjects => &["name", "code"],
            _ => &[],
        }
    }

    /// Foreign keys in other tables that point at this table
    pub fn referenced_by(&self) -> &'static [Reference] {
        use OnDelete::*;
        const USERS: &[Reference] = &[
            reference(Table::Classes, "teacher_id", SetNull),
            reference(Table::Classes, "created_by", SetNull),
            reference(Table::Students, "created_by", SetNull),
            reference(Table::Teachers, "created_by", SetNull),
            reference(Table::Subjects, "created_by", SetNull),
            reference(Table::Grades, "teacher_id", SetNull),
        ];
        const CLASSES: &[Reference] = &[reference(Table::Students, "class_id", SetNull)];
        const STUDENTS: &[Reference] = &[reference(Table::Grades, "student_id", Cascade)];
        const SUBJECTS: &[Reference] = &[reference(Table::Grades, "subject_id", Cascade)];
        match self {
            Table::Users => USERS,
            Table::Classes => CLASSES,
            Table::Students => STUDENTS,
            Table::Subjects => SUBJECTS,
            Table::Teachers | Table::Grades => &[],
        }
    }
}

/// Many-to-many link tables between a record and a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    /// Teachers assigned to a subject
    SubjectTeachers,
    /// Parents who are guardians of a student
    Guardians,
}

impl Link {
    pub const ALL: [Link; 2] = [Link::SubjectTeachers, Link::Guardians];

    pub fn name(&self) -> &'static str {
        match self {
            Link::SubjectTeachers => "subject_teachers",
            Link::Guardians => "guardians",
        }
    }

    pub fn record_table(&self) -> Table {
        match self {
            Link::SubjectTeachers => Table::Subjects,
            Link::Guardians => Table::Students,
        }
    }

    pub fn record_column(&self) -> &'static str {
        match self {
            Link::SubjectTeachers => "subject_id",
            Link::Guardians => "student_id",
        }
    }
}

/// Persistence collaborator: CRUD over named tables plus link sets.
///
/// Each write is applied atomically as a single-row statement. Deletes
/// cascade along [`Table::referenced_by`] and drop link rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Rows matching the filter's scope, ordered and limited
    async fn select(&self, filter: &Filter) -> Result<Vec<Row>, DatabaseError>;

    async fn select_id(&self, table: Table, id: Uuid) -> Result<Option<Row>, DatabaseError>;

    async fn count(&self, table: Table, scope: &Scope) -> Result<i64, DatabaseError>;

    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError>;

    /// Replace every column except `id` and `created_at`
    async fn update(&self, table: Table, id: Uuid, row: Row) -> Result<Row, DatabaseError>;

    /// Returns false when no row had that id
    async fn delete(&self, table: Table, id: Uuid) -> Result<bool, DatabaseError>;

    /// Idempotent
    async fn link(&self, link: Link, record: Uuid, user: Uuid) -> Result<(), DatabaseError>;

    /// Returns false when the pair was not linked
    async fn unlink(&self, link: Link, record: Uuid, user: Uuid) -> Result<bool, DatabaseError>;

    /// Record ids linked to a user
    async fn linked_records(&self, link: Link, user: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    /// User ids linked to a record
    async fn linked_users(&self, link: Link, record: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    /// Create tables if missing
    async fn migrate(&self) -> Result<(), DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Postgres when a database URL is configured, otherwise the in-memory store
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    if config.url.is_some() {
        Ok(Arc::new(PgStore::connect(config).await?))
    } else {
        tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
        Ok(Arc::new(MemoryStore::new()))
    }
}
