use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::database::Table;

/// Staff record for a teacher. Independent of user accounts with role Teacher:
/// nothing links a profile to a login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: Uuid,
    pub teacher_no: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeacherProfile {
    pub fn new(name: String, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            teacher_no: None,
            name,
            email: None,
            phone: None,
            specialization: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for TeacherProfile {
    const TABLE: Table = Table::Teachers;

    fn id(&self) -> Uuid {
        self.id
    }
}
