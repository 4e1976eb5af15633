use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::database::Table;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    /// Unique across all subjects
    pub name: String,
    /// Unique across all subjects
    pub code: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(name: String, code: String, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            code,
            description: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Subject {
    const TABLE: Table = Table::Subjects;

    fn id(&self) -> Uuid {
        self.id
    }
}
