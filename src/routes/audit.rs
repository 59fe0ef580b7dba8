// routes/audit.rs
// GET /api/v1/organizations/{org_id}/audit-log?table_name=... -> 200 [AuditLogEntry]
// Scoped to org admins (spec SPEC_FULL.md §B).

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::AppResult;
use crate::models::{AuditLogEntry, OrgRole};
use crate::state::{self, AppState};
use crate::tenancy;

#[derive(Deserialize)]
pub struct AuditLogQuery {
    pub table_name: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let role = crate::auth::role_in_organization(&state, auth.user.id, org_id).await?;
    tenancy::require_role(&role, OrgRole::Admin)?;
    let rows = state::list_audit_log(&state, org_id, query.table_name.as_deref()).await?;
    Ok(Json(rows))
}
