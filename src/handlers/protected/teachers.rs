// Teacher profiles: staff records, separate from Teacher-role login accounts

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::utils::{authorize, list_filter, nullable, optional_text, required_text};
use crate::app::AppState;
use crate::database::models::TeacherProfile;
use crate::database::Table;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::types::{Action, EntityKind};

#[derive(Debug, Deserialize)]
pub struct CreateTeacher {
    pub name: Option<String>,
    pub teacher_no: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeacher {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub teacher_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub specialization: Option<Option<String>>,
}

/// GET /api/teachers
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<TeacherProfile>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::Teacher, None)?;
    let filter = list_filter(&state, Table::Teachers, grant.scope, options)?;
    Ok(ApiResponse::success(state.repo::<TeacherProfile>().select_any(&filter).await?))
}

/// POST /api/teachers
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateTeacher>,
) -> ApiResult<TeacherProfile> {
    authorize(&current.actor, Action::Create, EntityKind::Teacher, None)?;

    let mut profile = TeacherProfile::new(required_text("name", payload.name)?, Some(current.actor.id));
    profile.teacher_no = optional_text(payload.teacher_no);
    profile.email = optional_text(payload.email);
    profile.phone = optional_text(payload.phone);
    profile.specialization = optional_text(payload.specialization);

    Ok(ApiResponse::created(state.repo::<TeacherProfile>().create(&profile).await?))
}

/// GET /api/teachers/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<TeacherProfile> {
    let profile = state.repo::<TeacherProfile>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::Teacher, Some(&Target::from(&profile)))?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/teachers/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateTeacher>,
) -> ApiResult<TeacherProfile> {
    let mut profile = state.repo::<TeacherProfile>().select_404(id).await?;
    authorize(&current.actor, Action::Update, EntityKind::Teacher, Some(&Target::from(&profile)))?;

    if payload.name.is_some() {
        profile.name = required_text("name", payload.name)?;
    }
    if let Some(v) = payload.teacher_no {
        profile.teacher_no = optional_text(v);
    }
    if let Some(v) = payload.email {
        profile.email = optional_text(v);
    }
    if let Some(v) = payload.phone {
        profile.phone = optional_text(v);
    }
    if let Some(v) = payload.specialization {
        profile.specialization = optional_text(v);
    }
    profile.updated_at = Utc::now();

    Ok(ApiResponse::success(state.repo::<TeacherProfile>().update(&profile).await?))
}

/// DELETE /api/teachers/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let profile = state.repo::<TeacherProfile>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::Teacher, Some(&Target::from(&profile)))?;
    state.repo::<TeacherProfile>().delete(id).await?;
    Ok(ApiResponse::no_content())
}
