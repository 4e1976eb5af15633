use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::utils::{authorize, check_reassign, ensure_user_with_role, list_filter, nullable, required_text};
use crate::app::AppState;
use crate::database::models::ClassRoom;
use crate::database::Table;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::types::{Action, EntityKind, Role};

#[derive(Debug, Deserialize)]
pub struct CreateClass {
    pub name: Option<String>,
    /// Class teacher, a user with role Teacher
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClass {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub teacher_id: Option<Option<Uuid>>,
}

async fn check_teacher(state: &AppState, teacher_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(id) = teacher_id {
        ensure_user_with_role(state, "teacher_id", id, Role::Teacher).await?;
    }
    Ok(())
}

/// GET /api/classes
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<ClassRoom>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::ClassRoom, None)?;
    let filter = list_filter(&state, Table::Classes, grant.scope, options)?;
    Ok(ApiResponse::success(state.repo::<ClassRoom>().select_any(&filter).await?))
}

/// POST /api/classes
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateClass>,
) -> ApiResult<ClassRoom> {
    authorize(&current.actor, Action::Create, EntityKind::ClassRoom, None)?;
    check_teacher(&state, payload.teacher_id).await?;

    let class = ClassRoom::new(required_text("name", payload.name)?, payload.teacher_id, Some(current.actor.id));
    Ok(ApiResponse::created(state.repo::<ClassRoom>().create(&class).await?))
}

/// GET /api/classes/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<ClassRoom> {
    let class = state.repo::<ClassRoom>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::ClassRoom, Some(&Target::from(&class)))?;
    Ok(ApiResponse::success(class))
}

/// PUT /api/classes/:id - changing the class teacher needs the reassign grant
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateClass>,
) -> ApiResult<ClassRoom> {
    let mut class = state.repo::<ClassRoom>().select_404(id).await?;
    let grant = authorize(&current.actor, Action::Update, EntityKind::ClassRoom, Some(&Target::from(&class)))?;

    if payload.name.is_some() {
        class.name = required_text("name", payload.name)?;
    }
    if let Some(teacher_id) = payload.teacher_id {
        check_reassign(&grant, &current.actor, EntityKind::ClassRoom, class.teacher_id, teacher_id)?;
        check_teacher(&state, teacher_id).await?;
        class.teacher_id = teacher_id;
    }
    class.updated_at = Utc::now();

    Ok(ApiResponse::success(state.repo::<ClassRoom>().update(&class).await?))
}

/// DELETE /api/classes/:id - students keep their record, without a class
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let class = state.repo::<ClassRoom>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::ClassRoom, Some(&Target::from(&class)))?;
    state.repo::<ClassRoom>().delete(id).await?;
    Ok(ApiResponse::no_content())
}
