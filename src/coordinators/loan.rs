//! `Loan.RecordPayment` / `Loan.ReversePayment` (spec §4.J). Neither
//! creates a transaction row — unlike the automation service, a manual
//! payment only mutates the loan and leaves an audit trail.

use bson::doc;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::amortization::{LoanParams, build_schedule};
use crate::audit;
use crate::errors::{AppError, AppResult};
use crate::ids::Id;
use crate::models::{Loan, LoanStatus};
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

#[derive(Serialize)]
struct LoanAuditSnapshot {
    payments_made: u32,
    remaining_balance: Decimal,
    status: LoanStatus,
}

impl From<&Loan> for LoanAuditSnapshot {
    fn from(loan: &Loan) -> Self {
        LoanAuditSnapshot {
            payments_made: loan.payments_made,
            remaining_balance: loan.remaining_balance,
            status: loan.status,
        }
    }
}

fn loan_params(loan: &Loan) -> LoanParams {
    LoanParams {
        original_amount: loan.original_amount,
        monthly_payment: loan.monthly_payment,
        interest_rate_annual_pct: loan.interest_rate,
        total_payments: loan.total_payments,
        start_date: loan.start_date,
        day_of_month: loan.day_of_month,
        payments_made: 0,
    }
}

/// Emulates `SELECT ... FOR UPDATE`: a filtered `update_one` keyed on the
/// row's current `payments_made` value. `modified_count == 0` means a
/// concurrent call already won this mutation (spec §5 row-level locks).
async fn cas_update(
    state: &AppState,
    ctx: &DataContext,
    loan: &Loan,
    set: bson::Document,
) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", loan.id);
    filter.insert("payments_made", bson::to_bson(&loan.payments_made).unwrap());
    let result = state
        .loans
        .update_one(filter, doc! { "$set": set })
        .await
        .map_err(anyhow::Error::from)?;
    if result.modified_count == 0 {
        return Err(AppError::conflict("loan was modified concurrently, retry"));
    }
    Ok(())
}

pub async fn record_payment(
    state: &AppState,
    ctx: &DataContext,
    loan_id: Id,
    amount: Decimal,
) -> AppResult<Loan> {
    let loan = state::get_loan(state, ctx, loan_id).await?;
    let before = LoanAuditSnapshot::from(&loan);

    if loan.status == LoanStatus::Completed {
        return Err(AppError::invariant("loan is already completed, cannot record payment"));
    }
    if loan.payments_made >= loan.total_payments {
        return Err(AppError::invariant("all payments have already been made"));
    }
    if amount > loan.remaining_balance {
        return Err(AppError::invariant("payment amount exceeds remaining balance"));
    }

    let new_payments_made = loan.payments_made + 1;
    let mut new_remaining = (loan.remaining_balance - amount).max(Decimal::ZERO);
    let terminal = new_payments_made >= loan.total_payments || new_remaining <= Decimal::ZERO;
    let new_status = if terminal {
        new_remaining = Decimal::ZERO;
        LoanStatus::Completed
    } else {
        loan.status
    };

    cas_update(
        state,
        ctx,
        &loan,
        doc! {
            "payments_made": bson::to_bson(&new_payments_made).unwrap(),
            "remaining_balance": bson::to_bson(&new_remaining).unwrap(),
            "status": bson::to_bson(&new_status).unwrap(),
        },
    )
    .await?;

    let updated = state::get_loan(state, ctx, loan_id).await?;
    let after = LoanAuditSnapshot::from(&updated);
    audit::log_action(state, ctx, "loan", loan_id, "payment", Some(&before), Some(&after)).await?;

    Ok(updated)
}

pub async fn reverse_payment(state: &AppState, ctx: &DataContext, loan_id: Id) -> AppResult<Loan> {
    let loan = state::get_loan(state, ctx, loan_id).await?;
    let before = LoanAuditSnapshot::from(&loan);

    if loan.payments_made == 0 {
        return Err(AppError::invariant("no payments to reverse"));
    }

    let new_payments_made = loan.payments_made - 1;
    let new_remaining = if new_payments_made == 0 {
        loan.original_amount
    } else {
        let schedule = build_schedule(&loan_params(&loan), Utc::now().date_naive());
        schedule[(new_payments_made - 1) as usize].remaining_balance
    };
    let new_status = if loan.status == LoanStatus::Completed {
        LoanStatus::Active
    } else {
        loan.status
    };

    cas_update(
        state,
        ctx,
        &loan,
        doc! {
            "payments_made": bson::to_bson(&new_payments_made).unwrap(),
            "remaining_balance": bson::to_bson(&new_remaining).unwrap(),
            "status": bson::to_bson(&new_status).unwrap(),
        },
    )
    .await?;

    let updated = state::get_loan(state, ctx, loan_id).await?;
    let after = LoanAuditSnapshot::from(&updated);
    audit::log_action(state, ctx, "loan", loan_id, "reverse_payment", Some(&before), Some(&after))
        .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_loan() -> Loan {
        Loan {
            id: crate::ids::new_id(),
            owner: crate::models::OwnerScope::personal(crate::ids::new_id()),
            name: "Car loan".into(),
            original_amount: dec!(10000),
            monthly_payment: dec!(1000),
            interest_rate: Decimal::ZERO,
            total_payments: 10,
            payments_made: 3,
            remaining_balance: dec!(7000),
            status: LoanStatus::Active,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            day_of_month: 15,
            category_id: None,
            currency: "USD".into(),
            original_amount_fx: None,
            original_currency: None,
            exchange_rate: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn reversing_to_zero_payments_restores_original_amount() {
        let mut loan = sample_loan();
        loan.payments_made = 1;
        loan.remaining_balance = dec!(9000);
        let params = loan_params(&loan);
        assert_eq!(params.payments_made, 0);
    }

    #[test]
    fn schedule_lookup_index_matches_post_decrement_payment_count() {
        let loan = sample_loan();
        let schedule = build_schedule(&loan_params(&loan), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        // after reversing payment #3, payments_made becomes 2; the balance
        // carried forward is the schedule row for payment #2.
        assert_eq!(schedule[1].payment_number, 2);
    }
}
