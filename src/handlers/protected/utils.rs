use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Entity, User};
use crate::database::Table;
use crate::error::ApiError;
use crate::filter::{Filter, FilterData};
use crate::policy::{AccessPolicy, Actor, Decision, Grant, Scope, Target};
use crate::types::{Action, EntityKind, Role};

/// Ask the access policy; a denial is logged with its reason and becomes a
/// generic 403.
pub fn authorize(actor: &Actor, action: Action, kind: EntityKind, target: Option<&Target<'_>>) -> Result<Grant, ApiError> {
    match AccessPolicy::decide(actor, action, kind, target) {
        Decision::Allow(grant) => Ok(grant),
        Decision::Deny { reason } => {
            tracing::warn!(
                actor = %actor.id,
                role = %actor.role,
                action = %action,
                entity = %kind,
                "Access denied: {}",
                reason
            );
            Err(ApiError::access_denied())
        }
    }
}

/// List query for `table` restricted to `scope`, with caller options applied
pub fn list_filter(state: &AppState, table: Table, scope: Scope, options: FilterData) -> Result<Filter, ApiError> {
    Ok(Filter::new(table)
        .with_scope(scope)
        .assign(options, state.config.api.max_list_limit)?)
}

/// Trimmed, non-empty text or a field error
pub fn required_text(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::field_error(field, "This field is required")),
    }
}

/// Empty strings become None
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(field: &str, value: &str, format: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), format)
        .map_err(|_| ApiError::field_error(field, format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// 400 unless a `T` with that id exists
pub async fn ensure_exists<T: Entity>(state: &AppState, field: &str, id: Uuid) -> Result<(), ApiError> {
    if state.repo::<T>().exists(id).await? {
        Ok(())
    } else {
        Err(ApiError::field_error(field, format!("{} {} does not exist", T::TABLE.name(), id)))
    }
}

/// 400 unless the user exists and holds `role`
pub async fn ensure_user_with_role(state: &AppState, field: &str, id: Uuid, role: Role) -> Result<User, ApiError> {
    match state.repo::<User>().select_one(id).await? {
        Some(user) if user.role == role => Ok(user),
        Some(user) => Err(ApiError::field_error(field, format!("User {} is a {}, not a {}", id, user.role, role))),
        None => Err(ApiError::field_error(field, format!("User {} does not exist", id))),
    }
}

/// Changing an ownership column needs the reassign grant
pub fn check_reassign(grant: &Grant, actor: &Actor, kind: EntityKind, current: Option<Uuid>, requested: Option<Uuid>) -> Result<(), ApiError> {
    if current == requested || grant.reassign_owner {
        return Ok(());
    }
    tracing::warn!(
        actor = %actor.id,
        role = %actor.role,
        entity = %kind,
        "Access denied: may not change the owning teacher"
    );
    Err(ApiError::access_denied())
}

/// For partial updates: absent is `None`, `null` is `Some(None)`.
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        class_id: Option<Option<Uuid>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"class_id": null}"#).unwrap();
        assert_eq!(absent.class_id, None);
        assert_eq!(null.class_id, Some(None));
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date("dob", "2011-03-07", "%Y-%m-%d").is_ok());
        let err = parse_date("dob", "07/03/2011", "%Y-%m-%d").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_text_is_missing() {
        assert!(required_text("name", Some("  ".into())).is_err());
        assert_eq!(required_text("name", Some(" Ada ".into())).unwrap(), "Ada");
        assert_eq!(optional_text(Some(String::new())), None);
    }
}
