use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::policy::Actor;
use crate::services::ActorService;

/// The user behind a valid token, with the relationships the policy needs
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub user: User,
    pub actor: Actor,
}

/// Middleware that validates the user from JWT claims against the users table.
/// Ensures the user still exists and holds the role the token was issued for.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get AuthUser from JWT middleware
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.repo::<User>().select_one(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!("User validation failed: user '{}' ({}) no longer exists", auth_user.name, auth_user.user_id);
        ApiError::unauthorized("User no longer exists")
    })?;

    if user.role != auth_user.role {
        tracing::warn!(
            "User validation failed: token role '{}' doesn't match database role '{}' for {}",
            auth_user.role,
            user.role,
            user.id
        );
        return Err(ApiError::unauthorized("User role mismatch"));
    }

    let actor = ActorService::new(state.store.clone()).resolve(&user).await?;

    tracing::debug!("User validation successful: {} ({}) as {}", user.name, user.id, user.role);

    // Inject validated user into request
    request.extensions_mut().insert(ValidatedUser { user, actor });

    Ok(next.run(request).await)
}
