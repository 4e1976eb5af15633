use axum::Extension;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::types::Role;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub assigned_subjects: BTreeSet<Uuid>,
    pub children: BTreeSet<Uuid>,
    pub student_id: Option<Uuid>,
}

/// GET /api/auth/whoami - The authenticated user and the relationships the
/// access policy sees for them
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "user_uuid",
///     "name": "Ms Adeyemi",
///     "email": "adeyemi@example.com",
///     "role": "Teacher",
///     "assigned_subjects": ["subject_uuid"],
///     "children": [],
///     "student_id": null
///   }
/// }
/// ```
pub async fn whoami(Extension(current): Extension<ValidatedUser>) -> ApiResult<WhoAmI> {
    let ValidatedUser { user, actor } = current;
    Ok(ApiResponse::success(WhoAmI {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        assigned_subjects: actor.assigned_subjects,
        children: actor.children,
        student_id: actor.student_id,
    }))
}
