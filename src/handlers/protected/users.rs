// Account management, admin only

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use super::utils::{authorize, list_filter, required_text};
use crate::app::AppState;
use crate::database::models::{User, UserView};
use crate::database::Table;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::Target;
use crate::services::{NewUser, UserService};
use crate::types::{Action, EntityKind, Role};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    QueryParams(options): QueryParams<FilterData>,
) -> ApiResult<Vec<UserView>> {
    let grant = authorize(&current.actor, Action::List, EntityKind::User, None)?;
    let filter = list_filter(&state, Table::Users, grant.scope, options)?;
    let users = state.repo::<User>().select_any(&filter).await?;
    Ok(ApiResponse::success(users.iter().map(User::view).collect()))
}

/// POST /api/users - `{name, email, password, role}`
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    JsonBody(payload): JsonBody<CreateUser>,
) -> ApiResult<UserView> {
    authorize(&current.actor, Action::Create, EntityKind::User, None)?;

    let role: Role = required_text("role", payload.role)?
        .parse()
        .map_err(|e: String| ApiError::field_error("role", e))?;
    let input = NewUser {
        name: required_text("name", payload.name)?,
        email: required_text("email", payload.email)?,
        password: payload.password.unwrap_or_default(),
        role,
    };

    let user = UserService::new(state.store.clone(), &state.config).create(input).await?;
    Ok(ApiResponse::created(user.view()))
}

/// GET /api/users/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<UserView> {
    let user = state.repo::<User>().select_404(id).await?;
    authorize(&current.actor, Action::Read, EntityKind::User, Some(&Target::from(&user)))?;
    Ok(ApiResponse::success(user.view()))
}

/// DELETE /api/users/:id - also clears the user's ownership of records and
/// their subject and guardian links
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<()> {
    let user = state.repo::<User>().select_404(id).await?;
    authorize(&current.actor, Action::Delete, EntityKind::User, Some(&Target::from(&user)))?;
    if user.id == current.user.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    state.repo::<User>().delete(id).await?;
    tracing::info!("User {} deleted by {}", user.email, current.user.id);
    Ok(ApiResponse::no_content())
}
