use axum::{
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::models::Entity;
use crate::database::{Repository, Store};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};

/// Shared by every handler: configuration and the store
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn repo<T: Entity>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(public::auth::login))
        // Protected API
        .merge(protected_routes(state.clone()))
        .layer(cors_layer(&state.config));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, classes, dashboard, grades, students, subjects, teachers, users};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/dashboard", get(dashboard::summary))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", get(users::show).delete(users::delete))
        .route("/api/students", get(students::list).post(students::create))
        .route(
            "/api/students/:id",
            get(students::show).put(students::update).delete(students::delete),
        )
        .route(
            "/api/students/:id/guardians/:user_id",
            put(students::assign_guardian).delete(students::unassign_guardian),
        )
        .route("/api/classes", get(classes::list).post(classes::create))
        .route(
            "/api/classes/:id",
            get(classes::show).put(classes::update).delete(classes::delete),
        )
        .route("/api/teachers", get(teachers::list).post(teachers::create))
        .route(
            "/api/teachers/:id",
            get(teachers::show).put(teachers::update).delete(teachers::delete),
        )
        .route("/api/subjects", get(subjects::list).post(subjects::create))
        .route(
            "/api/subjects/:id",
            get(subjects::show).put(subjects::update).delete(subjects::delete),
        )
        .route(
            "/api/subjects/:id/teachers/:user_id",
            put(subjects::assign_teacher).delete(subjects::unassign_teacher),
        )
        .route("/api/grades", get(grades::list).post(grades::create))
        .route(
            "/api/grades/:id",
            get(grades::show).put(grades::update).delete(grades::delete),
        )
        // Layers run bottom-up: the token is checked before the user is loaded
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment.is_development() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "EduTrack API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "School records with role-scoped access",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "dashboard": "/api/dashboard (protected)",
                "users": "/api/users[/:id] (protected - admin only)",
                "records": "/api/{students,classes,teachers,subjects,grades}[/:id] (protected)",
                "assignments": "/api/subjects/:id/teachers/:user_id, /api/students/:id/guardians/:user_id (protected)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
