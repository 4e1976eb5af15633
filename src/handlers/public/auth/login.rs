// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::issue_token;
use crate::database::models::UserView;
use crate::error::ApiError;
use crate::handlers::extract::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
    /// Seconds until the token expires
    pub expires_in: u64,
}

/// POST /auth/login - Authenticate user and receive JWT token
///
/// Expected Input:
/// ```json
/// { "email": "admin@example.com", "password": "password123" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "user": { "id": "...", "name": "Administrator", "email": "admin@example.com", "role": "Admin" },
///     "expires_in": 604800
///   }
/// }
/// ```
///
/// Unknown email and wrong password both answer 401 "Invalid credentials".
pub async fn login_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => (email, password),
        _ => return Err(ApiError::bad_request("Email and password are required")),
    };

    let users = UserService::new(state.store.clone(), &state.config);
    let user = users.authenticate(&email, &password).await?.ok_or_else(|| {
        tracing::info!("Failed login attempt for {}", email.trim());
        ApiError::unauthorized("Invalid credentials")
    })?;

    let token = issue_token(&user, &state.config.security).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    tracing::info!("User {} ({}) logged in", user.email, user.role);
    Ok(ApiResponse::success(LoginResponse {
        token,
        user: user.view(),
        expires_in: state.config.security.jwt_expiry_hours.saturating_mul(3600),
    }))
}
