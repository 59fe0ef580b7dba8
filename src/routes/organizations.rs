// routes/organizations.rs
// POST   /api/v1/organizations                     -> 201 Organization
// GET    /api/v1/organizations/{org_id}/members     -> 200 [OrgMember]
// POST   /api/v1/organizations/{org_id}/members     -> 200 (add/reactivate member)
// PATCH  /api/v1/organizations/{org_id}/members/{user_id} -> 200 (change role)
// DELETE /api/v1/organizations/{org_id}/members/{user_id} -> 204 (deactivate)

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::{AppError, AppResult};
use crate::models::{OrgMember, OrgRole, Organization};
use crate::state::{self, AppState};
use crate::tenancy;
use crate::validation;

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateOrganizationRequest>,
) -> AppResult<(StatusCode, Json<Organization>)> {
    let name = validation::validate_name(&body.name)?;
    let org = state::create_organization(&state, auth.user.id, &name)
        .await
        .map_err(AppError::Dependency)?;
    Ok((StatusCode::CREATED, Json(org)))
}

async fn caller_role(state: &AppState, org_id: Uuid, user_id: Uuid) -> AppResult<OrgRole> {
    crate::auth::role_in_organization(state, user_id, org_id).await
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrgMember>>> {
    caller_role(&state, org_id, auth.user.id).await?;
    let members = state::list_members(&state, org_id).await.map_err(AppError::Dependency)?;
    Ok(Json(members))
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    pub role: OrgRole,
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> AppResult<StatusCode> {
    let role = caller_role(&state, org_id, auth.user.id).await?;
    tenancy::require_role(&role, OrgRole::Admin)?;
    state::add_member(&state, org_id, body.user_id, body.role)
        .await
        .map_err(AppError::Dependency)?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: OrgRole,
}

pub async fn set_member_role(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SetRoleRequest>,
) -> AppResult<StatusCode> {
    let role = caller_role(&state, org_id, auth.user.id).await?;
    tenancy::require_role(&role, OrgRole::Admin)?;
    state::set_member_role(&state, org_id, user_id, body.role)
        .await
        .map_err(AppError::Dependency)?;
    Ok(StatusCode::OK)
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let role = caller_role(&state, org_id, auth.user.id).await?;
    tenancy::require_role(&role, OrgRole::Admin)?;
    state::remove_member(&state, org_id, user_id)
        .await
        .map_err(AppError::Dependency)?;
    Ok(StatusCode::NO_CONTENT)
}
