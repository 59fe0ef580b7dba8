use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{ApprovalStatus, ExpenseApproval};

use super::AppState;

pub async fn submit_expense_approval(
    state: &AppState,
    org_id: Id,
    requested_by: Id,
    amount: Decimal,
    currency: String,
    category_id: Option<Id>,
    description: String,
) -> AppResult<ExpenseApproval> {
    let row = ExpenseApproval {
        id: new_id(),
        org_id,
        requested_by,
        status: ApprovalStatus::Pending,
        amount,
        currency,
        category_id,
        description,
        rejection_reason: None,
        approved_by: None,
        transaction_id: None,
        requested_at: chrono::Utc::now(),
        resolved_at: None,
    };
    state
        .expense_approvals
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_expense_approval(state: &AppState, org_id: Id, id: Id) -> AppResult<ExpenseApproval> {
    state
        .expense_approvals
        .find_one(doc! { "_id": id, "org_id": org_id })
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("expense approval not found"))
}

pub async fn list_expense_approvals(
    state: &AppState,
    org_id: Id,
    status: Option<ApprovalStatus>,
) -> AppResult<Vec<ExpenseApproval>> {
    let mut filter = doc! { "org_id": org_id };
    if let Some(s) = status {
        filter.insert("status", bson::to_bson(&s).unwrap());
    }
    let mut cursor = state
        .expense_approvals
        .find(filter)
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    out.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
    Ok(out)
}

/// Both terminal transitions reject a second call with `Invariant`, not a
/// silent no-op (spec §4.K).
fn ensure_pending(approval: &ExpenseApproval) -> AppResult<()> {
    if !matches!(approval.status, ApprovalStatus::Pending) {
        return Err(AppError::invariant(
            "expense approval has already been resolved",
        ));
    }
    Ok(())
}

/// Sets `approved`, stamps `approved_by`/`resolved_at`, links
/// `transaction_id` back to the transaction the caller has already
/// created. The caller (the approval coordinator) owns transactionality
/// with the transaction insert.
pub async fn mark_approved(
    state: &AppState,
    org_id: Id,
    id: Id,
    approved_by: Id,
    transaction_id: Id,
) -> AppResult<ExpenseApproval> {
    let existing = get_expense_approval(state, org_id, id).await?;
    ensure_pending(&existing)?;
    state
        .expense_approvals
        .update_one(
            doc! { "_id": id, "org_id": org_id },
            doc! { "$set": {
                "status": bson::to_bson(&ApprovalStatus::Approved).unwrap(),
                "approved_by": approved_by,
                "transaction_id": transaction_id,
                "resolved_at": bson::to_bson(&chrono::Utc::now()).unwrap(),
            } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    get_expense_approval(state, org_id, id).await
}

pub async fn mark_rejected(
    state: &AppState,
    org_id: Id,
    id: Id,
    rejection_reason: String,
) -> AppResult<ExpenseApproval> {
    if rejection_reason.trim().is_empty() {
        return Err(AppError::invariant("rejection_reason must not be empty"));
    }
    let existing = get_expense_approval(state, org_id, id).await?;
    ensure_pending(&existing)?;
    state
        .expense_approvals
        .update_one(
            doc! { "_id": id, "org_id": org_id },
            doc! { "$set": {
                "status": bson::to_bson(&ApprovalStatus::Rejected).unwrap(),
                "rejection_reason": rejection_reason,
                "resolved_at": bson::to_bson(&chrono::Utc::now()).unwrap(),
            } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    get_expense_approval(state, org_id, id).await
}
