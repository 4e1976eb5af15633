use axum::{extract::State, Extension};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::utils::{
    authorize, ensure_exists, ensure_user_with_role, list_filter, nullable, optional_text, parse_date, required_text,
};
use crate::app::AppState;
use crate::database::models::student::DOB_INPUT_FORMAT;
use crate::database::models::{ClassRoom, Student, StudentView};
use crate::database::{Link, Table};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::types::{Action, EntityKind, Role};

#[derive(Debug, Deserialize)]
pub struct CreateStudent {
    pub name: Option<String>,
    pub admission_no: Option<String>,
    pub class_id: Option<Uuid>,
    /// YYYY-MM-DD
    pub dob: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudent {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub admission_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub class_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub dob: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct Guardians {
    pub student_id: Uuid,
    pub guardians: Vec<Uuid>,
}

fn parse_dob(value: Option<String>) -> Result<Option<chrono::NaiveDate>, ApiError> {
    match optional_text(value) {
        Some(dob) => Ok(Some(parse_date("dob", &dob, DOB_INPUT_FORMAT)?)),
        None => Ok(None),
    }
}

async fn check_class(state: &AppState, class_id: Option<Uuid>) -> Result<(), ApiError> {
    match class_id {
        Some(id) => ensure_exists::<ClassRoom>(state, "class_id", id).await,
        None => Ok(()),
    }
}

/// Views with each student's class name resolved
async fn views(state: &AppState, students: &[Student]) -> Result<Vec<StudentView>, ApiError> {
    let classes = state.repo::<ClassRoom>();
    let mut names: HashMap<Uuid, Option<String>> = HashMap::new();
    for class_id in students.iter().filter_map(|s| s.class_id) {
        if !names.contains_key(&class_id) {
            let name = classes.select_one(class_id).await?.map(|c| c.name);
            names.insert(class_id, name);
        }
    }
    Ok(students
        .iter()
        .map(|s| s.view(s.class_id.and_then(|id| names.get(&id).cloned().flatten())))
        .collect())
}

async fn view(state: &AppState, student: &Student) -> Result<StudentView, ApiError> {
    Ok(views(state, std::slice::from_ref(student)).await?.remove(0))
}

/// GET /api/students
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<StudentView>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::Student, None)?;
    let filter = list_filter(&state, Table::Students, grant.scope, options)?;
    let students = state.repo::<Student>().select_any(&filter).await?;
    Ok(ApiResponse::success(views(&state, &students).await?))
}

/// POST /api/students
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateStudent>,
) -> ApiResult<StudentView> {
    authorize(&current.actor, Action::Create, EntityKind::Student, None)?;

    let mut student = Student::new(required_text("name", payload.name)?, Some(current.actor.id));
    student.admission_no = optional_text(payload.admission_no);
    student.dob = parse_dob(payload.dob)?;
    student.gender = optional_text(payload.gender);
    student.class_id = payload.class_id;
    check_class(&state, student.class_id).await?;

    let student = state.repo::<Student>().create(&student).await?;
    Ok(ApiResponse::created(view(&state, &student).await?))
}

/// GET /api/students/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<StudentView> {
    let student = state.repo::<Student>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::Student, Some(&Target::from(&student)))?;
    Ok(ApiResponse::success(view(&state, &student).await?))
}

/// PUT /api/students/:id - only the fields present are changed
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateStudent>,
) -> ApiResult<StudentView> {
    let mut student = state.repo::<Student>().select_404(id).await?;
    authorize(&current.actor, Action::Update, EntityKind::Student, Some(&Target::from(&student)))?;

    if payload.name.is_some() {
        student.name = required_text("name", payload.name)?;
    }
    if let Some(admission_no) = payload.admission_no {
        student.admission_no = optional_text(admission_no);
    }
    if let Some(dob) = payload.dob {
        student.dob = parse_dob(dob)?;
    }
    if let Some(gender) = payload.gender {
        student.gender = optional_text(gender);
    }
    if let Some(class_id) = payload.class_id {
        check_class(&state, class_id).await?;
        student.class_id = class_id;
    }
    student.updated_at = Utc::now();

    let student = state.repo::<Student>().update(&student).await?;
    Ok(ApiResponse::success(view(&state, &student).await?))
}

/// DELETE /api/students/:id - the student's grades go with it
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let student = state.repo::<Student>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::Student, Some(&Target::from(&student)))?;
    state.repo::<Student>().delete(id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/students/:id/guardians/:user_id - link a parent to a student
pub async fn assign_guardian(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams((id, user_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<Guardians> {
    let student = state.repo::<Student>().select_404(id).await?;
    let target = Target::from(&student).with_member(user_id);
    authorize(&current.actor, Action::Assign, EntityKind::Student, Some(&target))?;
    ensure_user_with_role(&state, "user_id", user_id, Role::Parent).await?;

    state.store.link(Link::Guardians, student.id, user_id).await?;
    tracing::info!("Parent {} linked to student {}", user_id, student.id);

    let guardians = state.store.linked_users(Link::Guardians, student.id).await?;
    Ok(ApiResponse::success(Guardians { student_id: student.id, guardians }))
}

/// DELETE /api/students/:id/guardians/:user_id
pub async fn unassign_guardian(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams((id, user_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<Guardians> {
    let student = state.repo::<Student>().select_404(id).await?;
    let target = Target::from(&student).with_member(user_id);
    authorize(&current.actor, Action::Unassign, EntityKind::Student, Some(&target))?;

    if !state.store.unlink(Link::Guardians, student.id, user_id).await? {
        return Err(ApiError::not_found(format!("User {} is not a guardian of student {}", user_id, student.id)));
    }

    let guardians = state.store.linked_users(Link::Guardians, student.id).await?;
    Ok(ApiResponse::success(Guardians { student_id: student.id, guardians }))
}
