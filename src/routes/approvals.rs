// routes/approvals.rs
// POST /api/v1/organizations/{org_id}/approvals            -> 201 ExpenseApproval
// GET  /api/v1/organizations/{org_id}/approvals             -> 200 [ExpenseApproval]
// POST /api/v1/organizations/{org_id}/approvals/{id}/approve -> 200 ExpenseApproval
// POST /api/v1/organizations/{org_id}/approvals/{id}/reject  -> 200 ExpenseApproval

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::coordinators::approval;
use crate::errors::AppResult;
use crate::models::{ApprovalStatus, ExpenseApproval};
use crate::state::{self, AppState};

#[derive(Deserialize)]
pub struct SubmitApprovalRequest {
    pub amount: Decimal,
    pub currency: String,
    pub category_id: Option<Uuid>,
    pub description: String,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
    Json(body): Json<SubmitApprovalRequest>,
) -> AppResult<(StatusCode, Json<ExpenseApproval>)> {
    let role = crate::auth::role_in_organization(&state, auth.user.id, org_id).await?;
    let approval = approval::submit(
        &state,
        org_id,
        auth.user.id,
        role,
        body.amount,
        body.currency,
        body.category_id,
        body.description,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(approval)))
}

#[derive(Deserialize)]
pub struct ListApprovalsQuery {
    pub status: Option<ApprovalStatus>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListApprovalsQuery>,
) -> AppResult<Json<Vec<ExpenseApproval>>> {
    crate::auth::role_in_organization(&state, auth.user.id, org_id).await?;
    let rows = state::list_expense_approvals(&state, org_id, query.status).await?;
    Ok(Json(rows))
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path((org_id, approval_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ExpenseApproval>> {
    let role = crate::auth::role_in_organization(&state, auth.user.id, org_id).await?;
    let row = approval::approve(&state, org_id, approval_id, auth.user.id, role).await?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct RejectApprovalRequest {
    pub rejection_reason: String,
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    Path((org_id, approval_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RejectApprovalRequest>,
) -> AppResult<Json<ExpenseApproval>> {
    let role = crate::auth::role_in_organization(&state, auth.user.id, org_id).await?;
    let row = approval::reject(&state, org_id, approval_id, auth.user.id, role, body.rejection_reason).await?;
    Ok(Json(row))
}
