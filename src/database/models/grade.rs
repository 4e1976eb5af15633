use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::database::Table;

pub const DEFAULT_MAX_SCORE: f64 = 100.0;
pub const DEFAULT_GRADE_TYPE: &str = "exam";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    /// Grading teacher; cleared if that user is deleted
    pub teacher_id: Option<Uuid>,
    pub score: f64,
    pub max_score: f64,
    pub grade_type: String,
    pub date_given: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    pub fn new(student_id: Uuid, subject_id: Uuid, teacher_id: Option<Uuid>, score: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            subject_id,
            teacher_id,
            score,
            max_score: DEFAULT_MAX_SCORE,
            grade_type: DEFAULT_GRADE_TYPE.to_string(),
            date_given: now.date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    /// score / max_score * 100, or None when max_score is not positive
    pub fn percentage(&self) -> Option<f64> {
        if self.max_score > 0.0 {
            Some(self.score / self.max_score * 100.0)
        } else {
            None
        }
    }

    pub fn view(&self) -> GradeView {
        GradeView {
            percentage: self.percentage(),
            grade: self.clone(),
        }
    }
}

impl Entity for Grade {
    const TABLE: Table = Table::Grades;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeView {
    #[serde(flatten)]
    pub grade: Grade,
    pub percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_guarded_against_zero_max() {
        let mut g = Grade::new(Uuid::new_v4(), Uuid::new_v4(), None, 45.0);
        g.max_score = 60.0;
        assert_eq!(g.percentage(), Some(75.0));

        g.max_score = 0.0;
        assert_eq!(g.percentage(), None);
    }
}
