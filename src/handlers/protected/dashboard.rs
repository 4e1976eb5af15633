use axum::{extract::State, Extension};
use std::collections::BTreeMap;

use crate::app::AppState;
use crate::database::Table;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::policy::{AccessPolicy, Decision};
use crate::types::EntityKind;

const COUNTED: [(EntityKind, Table, &str); 4] = [
    (EntityKind::Student, Table::Students, "students"),
    (EntityKind::ClassRoom, Table::Classes, "classes"),
    (EntityKind::Subject, Table::Subjects, "subjects"),
    (EntityKind::Grade, Table::Grades, "grades"),
];

/// GET /api/dashboard - record counts within the caller's visibility.
/// Entity types the caller may not list are left out rather than denied.
///
/// ```json
/// { "success": true, "data": { "grades": 3 } }
/// ```
pub async fn summary(
    State(state): State<AppState>,
    Extension(current): Extension<ValidatedUser>,
) -> ApiResult<BTreeMap<&'static str, i64>> {
    let mut counts = BTreeMap::new();
    for (kind, table, key) in COUNTED {
        if let Decision::Allow(grant) = AccessPolicy::visibility(&current.actor, kind) {
            counts.insert(key, state.store.count(table, &grant.scope).await?);
        }
    }
    Ok(ApiResponse::success(counts))
}
