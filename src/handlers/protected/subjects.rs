use axum::{extract::State, Extension};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::utils::{authorize, ensure_user_with_role, list_filter, nullable, optional_text, required_text};
use crate::app::AppState;
use crate::database::models::Subject;
use crate::database::{Link, Table};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::types::{Action, EntityKind, Role};

#[derive(Debug, Deserialize)]
pub struct CreateSubject {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubject {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct SubjectTeachers {
    pub subject_id: Uuid,
    pub teachers: Vec<Uuid>,
}

/// GET /api/subjects
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<Subject>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::Subject, None)?;
    let filter = list_filter(&state, Table::Subjects, grant.scope, options)?;
    Ok(ApiResponse::success(state.repo::<Subject>().select_any(&filter).await?))
}

/// POST /api/subjects - name and code must be unique (409 otherwise)
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateSubject>,
) -> ApiResult<Subject> {
    authorize(&current.actor, Action::Create, EntityKind::Subject, None)?;

    let mut subject = Subject::new(
        required_text("name", payload.name)?,
        required_text("code", payload.code)?,
        Some(current.actor.id),
    );
    subject.description = optional_text(payload.description);

    Ok(ApiResponse::created(state.repo::<Subject>().create(&subject).await?))
}

/// GET /api/subjects/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Subject> {
    let subject = state.repo::<Subject>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::Subject, Some(&Target::from(&subject)))?;
    Ok(ApiResponse::success(subject))
}

/// PUT /api/subjects/:id - creator or an assigned teacher
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateSubject>,
) -> ApiResult<Subject> {
    let mut subject = state.repo::<Subject>().select_404(id).await?;
    authorize(&current.actor, Action::Update, EntityKind::Subject, Some(&Target::from(&subject)))?;

    if payload.name.is_some() {
        subject.name = required_text("name", payload.name)?;
    }
    if payload.code.is_some() {
        subject.code = required_text("code", payload.code)?;
    }
    if let Some(description) = payload.description {
        subject.description = optional_text(description);
    }
    subject.updated_at = Utc::now();

    Ok(ApiResponse::success(state.repo::<Subject>().update(&subject).await?))
}

/// DELETE /api/subjects/:id - creator only; grades for the subject go with it
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let subject = state.repo::<Subject>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::Subject, Some(&Target::from(&subject)))?;
    state.repo::<Subject>().delete(id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/subjects/:id/teachers/:user_id - teachers may only assign themselves
pub async fn assign_teacher(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams((id, user_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<SubjectTeachers> {
    let subject = state.repo::<Subject>().select_404(id).await?;
    let target = Target::from(&subject).with_member(user_id);
    authorize(&current.actor, Action::Assign, EntityKind::Subject, Some(&target))?;
    ensure_user_with_role(&state, "user_id", user_id, Role::Teacher).await?;

    state.store.link(Link::SubjectTeachers, subject.id, user_id).await?;
    tracing::info!("Teacher {} assigned to subject {}", user_id, subject.code);

    let teachers = state.store.linked_users(Link::SubjectTeachers, subject.id).await?;
    Ok(ApiResponse::success(SubjectTeachers { subject_id: subject.id, teachers }))
}

/// DELETE /api/subjects/:id/teachers/:user_id
pub async fn unassign_teacher(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams((id, user_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<SubjectTeachers> {
    let subject = state.repo::<Subject>().select_404(id).await?;
    let target = Target::from(&subject).with_member(user_id);
    authorize(&current.actor, Action::Unassign, EntityKind::Subject, Some(&target))?;

    if !state.store.unlink(Link::SubjectTeachers, subject.id, user_id).await? {
        return Err(ApiError::not_found(format!("User {} is not assigned to subject {}", user_id, subject.id)));
    }
    tracing::info!("Teacher {} unassigned from subject {}", user_id, subject.code);

    let teachers = state.store.linked_users(Link::SubjectTeachers, subject.id).await?;
    Ok(ApiResponse::success(SubjectTeachers { subject_id: subject.id, teachers }))
}
