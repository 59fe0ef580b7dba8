//! `ExpenseApproval.Submit` / `.Approve` / `.Reject` (spec §4.K). Approving
//! is the one coordinator action that auto-creates a transaction row,
//! unlike the loan/installment coordinators which only move counters.

use rust_decimal::Decimal;

use crate::audit;
use crate::errors::{AppError, AppResult};
use crate::ids::Id;
use crate::models::{EntryPattern, ExpenseApproval, FlowType, OrgRole};
use crate::state::{self, AppState, NewTransaction};
use crate::tenancy::{self, DataContext};

fn ensure_positive_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::invariant("amount must be positive"));
    }
    Ok(())
}

fn ensure_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::invariant("description must not be empty"));
    }
    Ok(())
}

pub async fn submit(
    state: &AppState,
    org_id: Id,
    caller_id: Id,
    caller_role: OrgRole,
    amount: Decimal,
    currency: String,
    category_id: Option<Id>,
    description: String,
) -> AppResult<ExpenseApproval> {
    tenancy::require_role(&caller_role, OrgRole::Member)?;
    ensure_positive_amount(amount)?;
    ensure_description(&description)?;

    let approval = state::submit_expense_approval(
        state, org_id, caller_id, amount, currency, category_id, description,
    )
    .await?;

    let ctx = DataContext::organizational(caller_id, org_id);
    audit::log_action::<(), _>(state, &ctx, "expense_approval", approval.id, "submit", None, Some(&approval))
        .await?;
    Ok(approval)
}

/// Approves the request, then creates an org-scoped expense transaction
/// carrying the approval's amount/currency/category, and links
/// `transaction_id` back onto the approval row.
pub async fn approve(
    state: &AppState,
    org_id: Id,
    approval_id: Id,
    caller_id: Id,
    caller_role: OrgRole,
) -> AppResult<ExpenseApproval> {
    tenancy::require_role(&caller_role, OrgRole::Admin)?;

    let before = state::get_expense_approval(state, org_id, approval_id).await?;
    let ctx = DataContext::organizational(caller_id, org_id);

    let tx = state::create_transaction(
        state,
        &ctx,
        NewTransaction {
            amount: before.amount,
            currency: before.currency.clone(),
            flow_type: FlowType::Expense,
            category_id: before.category_id,
            description: before.description.clone(),
            date: chrono::Utc::now().date_naive(),
            entry_pattern: EntryPattern::OneTime,
            is_recurring: false,
            recurring_source_id: None,
            installment_id: None,
            installment_number: None,
            loan_id: None,
            credit_card_id: None,
            bank_account_id: None,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
        },
    )
    .await?;

    let approved = state::mark_approved(state, org_id, approval_id, caller_id, tx.id).await?;
    audit::log_action(
        state,
        &ctx,
        "expense_approval",
        approval_id,
        "approve",
        Some(&before),
        Some(&approved),
    )
    .await?;
    Ok(approved)
}

pub async fn reject(
    state: &AppState,
    org_id: Id,
    approval_id: Id,
    caller_id: Id,
    caller_role: OrgRole,
    rejection_reason: String,
) -> AppResult<ExpenseApproval> {
    tenancy::require_role(&caller_role, OrgRole::Admin)?;

    let before = state::get_expense_approval(state, org_id, approval_id).await?;
    let rejected = state::mark_rejected(state, org_id, approval_id, rejection_reason).await?;

    let ctx = DataContext::organizational(caller_id, org_id);
    audit::log_action(
        state,
        &ctx,
        "expense_approval",
        approval_id,
        "reject",
        Some(&before),
        Some(&rejected),
    )
    .await?;
    Ok(rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_zero_amount() {
        assert!(ensure_positive_amount(Decimal::ZERO).is_err());
        assert!(ensure_positive_amount(dec!(-5)).is_err());
        assert!(ensure_positive_amount(dec!(1)).is_ok());
    }

    #[test]
    fn rejects_blank_description() {
        assert!(ensure_description("   ").is_err());
        assert!(ensure_description("Office supplies").is_ok());
    }
}
