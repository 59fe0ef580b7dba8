//! `Installment.MarkPaid` / `Installment.ReversePayment` (spec §4.J).
//! Analogous to the loan coordinator: no transaction row is created here,
//! only the plan's payment counter moves and an audit entry is written.

use bson::doc;
use serde::Serialize;

use crate::audit;
use crate::errors::{AppError, AppResult};
use crate::ids::Id;
use crate::models::Installment;
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

#[derive(Serialize)]
struct InstallmentAuditSnapshot {
    payments_completed: u32,
    complete: bool,
}

impl From<&Installment> for InstallmentAuditSnapshot {
    fn from(installment: &Installment) -> Self {
        InstallmentAuditSnapshot {
            payments_completed: installment.payments_completed,
            complete: state::is_complete(installment),
        }
    }
}

pub async fn mark_paid(state: &AppState, ctx: &DataContext, installment_id: Id) -> AppResult<Installment> {
    let before = InstallmentAuditSnapshot::from(&state::get_installment(state, ctx, installment_id).await?);
    let updated = state::record_installment_payment(state, ctx, installment_id).await?;
    let after = InstallmentAuditSnapshot::from(&updated);
    audit::log_action(
        state,
        ctx,
        "installment",
        installment_id,
        "payment",
        Some(&before),
        Some(&after),
    )
    .await?;
    Ok(updated)
}

/// Reverse the most recent payment. The counter-only CAS mirrors the loan
/// coordinator's row lock (spec §5): filter on the current
/// `payments_completed` value, `modified_count == 0` means a concurrent
/// caller already won the mutation.
pub async fn reverse_payment(state: &AppState, ctx: &DataContext, installment_id: Id) -> AppResult<Installment> {
    let installment = state::get_installment(state, ctx, installment_id).await?;
    let before = InstallmentAuditSnapshot::from(&installment);

    if installment.payments_completed == 0 {
        return Err(AppError::invariant("no payments to reverse"));
    }
    let new_payments_completed = installment.payments_completed - 1;

    let mut filter = ctx.ownership_filter();
    filter.insert("_id", installment_id);
    filter.insert(
        "payments_completed",
        bson::to_bson(&installment.payments_completed).unwrap(),
    );
    let result = state
        .installments
        .update_one(
            filter,
            doc! { "$set": { "payments_completed": bson::to_bson(&new_payments_completed).unwrap() } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    if result.modified_count == 0 {
        return Err(AppError::conflict("installment was modified concurrently, retry"));
    }

    let updated = state::get_installment(state, ctx, installment_id).await?;
    let after = InstallmentAuditSnapshot::from(&updated);
    audit::log_action(
        state,
        ctx,
        "installment",
        installment_id,
        "reverse_payment",
        Some(&before),
        Some(&after),
    )
    .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_installment() -> Installment {
        Installment {
            id: crate::ids::new_id(),
            owner: crate::models::OwnerScope::personal(crate::ids::new_id()),
            name: "New laptop".into(),
            total_amount: dec!(3000),
            monthly_amount: dec!(300),
            number_of_payments: 10,
            payments_completed: 4,
            flow_type: crate::models::FlowType::Expense,
            category_id: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            day_of_month: 10,
            currency: "USD".into(),
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn snapshot_reflects_completion() {
        let mut installment = sample_installment();
        installment.payments_completed = 10;
        let snap = InstallmentAuditSnapshot::from(&installment);
        assert!(snap.complete);
    }

    #[test]
    fn snapshot_incomplete_when_below_total() {
        let installment = sample_installment();
        let snap = InstallmentAuditSnapshot::from(&installment);
        assert!(!snap.complete);
    }
}
