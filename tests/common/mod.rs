#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use edutrack::auth::issue_token;
use edutrack::config::AppConfig;
use edutrack::database::models::User;
use edutrack::database::{MemoryStore, Store};
use edutrack::services::{NewUser, UserService};
use edutrack::types::Role;
use edutrack::{app, AppState};

pub const PASSWORD: &str = "password";

/// The full router over a fresh in-memory store
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Development config, adjusted before the router is built
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::development();
        config.security.bcrypt_cost = 4;
        adjust(&mut config);
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store);
        let router = app(state.clone());
        Self { state, router }
    }

    pub async fn user(&self, name: &str, role: Role) -> Result<User> {
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        let user = UserService::new(self.state.store.clone(), &self.state.config)
            .create(NewUser {
                name: name.to_string(),
                email,
                password: PASSWORD.to_string(),
                role,
            })
            .await?;
        Ok(user)
    }

    /// A user plus a bearer token for them
    pub async fn login_as(&self, name: &str, role: Role) -> Result<(User, String)> {
        let user = self.user(name, role).await?;
        let token = self.token(&user)?;
        Ok((user, token))
    }

    pub fn token(&self, user: &User) -> Result<String> {
        Ok(issue_token(user, &self.state.config.security)?)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await.context("router call failed")?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok(Response { status, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// POST that must succeed with 201; returns the created record's id
    pub async fn create(&self, uri: &str, token: &str, body: Value) -> Result<String> {
        let res = self.post(uri, token, body).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "POST {} -> {}: {}", uri, res.status, res.body);
        res.data()["id"].as_str().map(str::to_string).context("created record has no id")
    }
}

pub fn assert_denied(res: &Response) {
    assert_eq!(res.status, StatusCode::FORBIDDEN, "body: {}", res.body);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"], "Access denied");
}
