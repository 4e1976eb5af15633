use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::database::Table;

/// Display format for dates of birth in API output, e.g. "07 Mar 2011"
pub const DOB_DISPLAY_FORMAT: &str = "%d %b %Y";

/// Input format for dates of birth
pub const DOB_INPUT_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub admission_no: Option<String>,
    pub name: String,
    pub class_id: Option<Uuid>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: String, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            admission_no: None,
            name,
            class_id: None,
            dob: None,
            gender: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the API representation; `class_name` is resolved by the caller
    pub fn view(&self, class_name: Option<String>) -> StudentView {
        StudentView {
            id: self.id,
            admission_no: self.admission_no.clone(),
            name: self.name.clone(),
            class_id: self.class_id,
            dob: self.dob.map(|d| d.format(DOB_DISPLAY_FORMAT).to_string()),
            gender: self.gender.clone(),
            class_name,
        }
    }
}

impl Entity for Student {
    const TABLE: Table = Table::Students;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub id: Uuid,
    pub admission_no: Option<String>,
    pub name: String,
    pub class_id: Option<Uuid>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub class_name: Option<String>,
}
