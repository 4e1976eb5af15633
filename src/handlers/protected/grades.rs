use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::utils::{authorize, check_reassign, ensure_exists, ensure_user_with_role, list_filter, optional_text, parse_date};
use crate::app::AppState;
use crate::database::models::{Grade, GradeView, Student, Subject};
use crate::database::Table;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::types::{Action, EntityKind, Role};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
pub struct CreateGrade {
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub grade_type: Option<String>,
    /// YYYY-MM-DD, defaults to today
    pub date_given: Option<String>,
    /// Grading teacher; only an admin may name someone else
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGrade {
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub grade_type: Option<String>,
    pub date_given: Option<String>,
    pub teacher_id: Option<Uuid>,
}

fn finite(field: &str, value: f64) -> Result<f64, ApiError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ApiError::field_error(field, "Must be a number"))
    }
}

fn positive(field: &str, value: f64) -> Result<f64, ApiError> {
    match finite(field, value)? {
        v if v > 0.0 => Ok(v),
        _ => Err(ApiError::field_error(field, "Must be greater than zero")),
    }
}

async fn check_teacher(state: &AppState, teacher_id: Uuid) -> Result<(), ApiError> {
    ensure_user_with_role(state, "teacher_id", teacher_id, Role::Teacher).await?;
    Ok(())
}

/// GET /api/grades - each role sees its own slice: a teacher the grades
/// they gave, a student their own, a parent their children's
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<GradeView>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::Grade, None)?;
    let filter = list_filter(&state, Table::Grades, grant.scope, options)?;
    let grades = state.repo::<Grade>().select_any(&filter).await?;
    Ok(ApiResponse::success(grades.iter().map(Grade::view).collect()))
}

/// POST /api/grades
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateGrade>,
) -> ApiResult<GradeView> {
    let grant = authorize(&current.actor, Action::Create, EntityKind::Grade, None)?;
    let actor = &current.actor;

    let student_id = payload.student_id.ok_or_else(|| ApiError::field_error("student_id", "This field is required"))?;
    let subject_id = payload.subject_id.ok_or_else(|| ApiError::field_error("subject_id", "This field is required"))?;
    let score = finite("score", payload.score.ok_or_else(|| ApiError::field_error("score", "This field is required"))?)?;

    let teacher_id = payload.teacher_id.unwrap_or(actor.id);
    check_reassign(&grant, actor, EntityKind::Grade, Some(actor.id), Some(teacher_id))?;
    if teacher_id != actor.id {
        check_teacher(&state, teacher_id).await?;
    }

    ensure_exists::<Student>(&state, "student_id", student_id).await?;
    ensure_exists::<Subject>(&state, "subject_id", subject_id).await?;

    let mut grade = Grade::new(student_id, subject_id, Some(teacher_id), score);
    if let Some(max_score) = payload.max_score {
        grade.max_score = positive("max_score", max_score)?;
    }
    if let Some(grade_type) = optional_text(payload.grade_type) {
        grade.grade_type = grade_type;
    }
    if let Some(date) = optional_text(payload.date_given) {
        grade.date_given = parse_date("date_given", &date, DATE_FORMAT)?;
    }

    let grade = state.repo::<Grade>().create(&grade).await?;
    tracing::info!("Grade {} recorded for student {} by {}", grade.id, grade.student_id, actor.id);
    Ok(ApiResponse::created(grade.view()))
}

/// GET /api/grades/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<GradeView> {
    let grade = state.repo::<Grade>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::Grade, Some(&Target::from(&grade)))?;
    Ok(ApiResponse::success(grade.view()))
}

/// PUT /api/grades/:id - the grading teacher or an admin; only an admin may
/// hand the grade to another teacher
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateGrade>,
) -> ApiResult<GradeView> {
    let mut grade = state.repo::<Grade>().select_404(id).await?;
    let grant = authorize(&current.actor, Action::Update, EntityKind::Grade, Some(&Target::from(&grade)))?;

    if let Some(teacher_id) = payload.teacher_id {
        check_reassign(&grant, &current.actor, EntityKind::Grade, grade.teacher_id, Some(teacher_id))?;
        if grade.teacher_id != Some(teacher_id) {
            check_teacher(&state, teacher_id).await?;
        }
        grade.teacher_id = Some(teacher_id);
    }
    if let Some(student_id) = payload.student_id {
        ensure_exists::<Student>(&state, "student_id", student_id).await?;
        grade.student_id = student_id;
    }
    if let Some(subject_id) = payload.subject_id {
        ensure_exists::<Subject>(&state, "subject_id", subject_id).await?;
        grade.subject_id = subject_id;
    }
    if let Some(score) = payload.score {
        grade.score = finite("score", score)?;
    }
    if let Some(max_score) = payload.max_score {
        grade.max_score = positive("max_score", max_score)?;
    }
    if let Some(grade_type) = optional_text(payload.grade_type) {
        grade.grade_type = grade_type;
    }
    if let Some(date) = optional_text(payload.date_given) {
        grade.date_given = parse_date("date_given", &date, DATE_FORMAT)?;
    }
    grade.updated_at = Utc::now();

    let grade = state.repo::<Grade>().update(&grade).await?;
    Ok(ApiResponse::success(grade.view()))
}

/// DELETE /api/grades/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let grade = state.repo::<Grade>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::Grade, Some(&Target::from(&grade)))?;
    state.repo::<Grade>().delete(id).await?;
    Ok(ApiResponse::no_content())
}
