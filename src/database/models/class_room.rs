use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::database::Table;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRoom {
    pub id: Uuid,
    pub name: String,
    /// Class teacher (a user with role Teacher)
    pub teacher_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassRoom {
    pub fn new(name: String, teacher_id: Option<Uuid>, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            teacher_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for ClassRoom {
    const TABLE: Table = Table::Classes;

    fn id(&self) -> Uuid {
        self.id
    }
}
