use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, PasswordError};
use crate::config::{AppConfig, SeedConfig};
use crate::database::models::User;
use crate::database::{DatabaseError, Repository, Store, Table};
use crate::filter::Filter;
use crate::policy::{Field, Predicate, Scope};
use crate::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] PasswordError),
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },
}

/// Input for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub struct UserService {
    users: Repository<User>,
    bcrypt_cost: u32,
}

/// Emails are compared trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            users: Repository::new(store),
            bcrypt_cost: config.security.bcrypt_cost,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let filter = Filter::new(Table::Users)
            .with_scope(Scope::only(Predicate::eq_text(Field::Email, normalize_email(email))))
            .limit(1);
        Ok(self.users.select_any(&filter).await?.into_iter().next())
    }

    /// The user whose email and password match, if any
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, UserError> {
        match self.find_by_email(email).await? {
            Some(user) if verify_password(password, &user.password_hash).await? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    pub async fn create(&self, input: NewUser) -> Result<User, UserError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UserError::InvalidInput { field: "name", message: "must not be empty".to_string() });
        }
        let email = normalize_email(&input.email);
        if !email.contains('@') {
            return Err(UserError::InvalidInput { field: "email", message: "must be an email address".to_string() });
        }
        if input.password.is_empty() {
            return Err(UserError::InvalidInput { field: "password", message: "must not be empty".to_string() });
        }

        let hash = hash_password(&input.password, self.bcrypt_cost).await?;
        let user = User::new(name.to_string(), email, hash, input.role);
        let created = self.users.create(&user).await?;
        tracing::info!("Created {} user {} ({})", created.role, created.email, created.id);
        Ok(created)
    }

    /// Creates the seed admin unless a user with that email exists.
    /// Returns the account and whether it was created now.
    pub async fn ensure_admin(&self, seed: &SeedConfig) -> Result<(User, bool), UserError> {
        if let Some(existing) = self.find_by_email(&seed.admin_email).await? {
            return Ok((existing, false));
        }
        let admin = self
            .create(NewUser {
                name: seed.admin_name.clone(),
                email: seed.admin_email.clone(),
                password: seed.admin_password.clone(),
                role: Role::Admin,
            })
            .await?;
        Ok((admin, true))
    }

    pub async fn get(&self, id: Uuid) -> Result<User, UserError> {
        Ok(self.users.select_404(id).await?)
    }
}
