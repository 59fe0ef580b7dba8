use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{Loan, LoanStatus};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewLoan {
    pub name: String,
    pub original_amount: Decimal,
    pub monthly_payment: Decimal,
    pub interest_rate: Decimal,
    pub total_payments: u32,
    pub start_date: chrono::NaiveDate,
    pub day_of_month: u32,
    pub category_id: Option<Id>,
    pub currency: String,
    pub original_amount_fx: Option<Decimal>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
}

pub async fn create_loan(state: &AppState, ctx: &DataContext, new: NewLoan) -> AppResult<Loan> {
    if new.total_payments == 0 {
        return Err(AppError::invariant("total_payments must be at least 1"));
    }
    let row = Loan {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        original_amount: new.original_amount,
        monthly_payment: new.monthly_payment,
        interest_rate: new.interest_rate,
        total_payments: new.total_payments,
        payments_made: 0,
        remaining_balance: new.original_amount,
        status: LoanStatus::Active,
        start_date: new.start_date,
        day_of_month: new.day_of_month,
        category_id: new.category_id,
        currency: new.currency,
        original_amount_fx: new.original_amount_fx,
        original_currency: new.original_currency,
        exchange_rate: new.exchange_rate,
        created_at: chrono::Utc::now(),
    };
    state.loans.insert_one(&row).await.map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_loan(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Loan> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .loans
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("loan not found"))
}

pub async fn list_loans(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Loan>> {
    let mut cursor = state
        .loans
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(l) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(l);
    }
    Ok(out)
}

pub async fn list_active_loans(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Loan>> {
    Ok(list_loans(state, ctx)
        .await?
        .into_iter()
        .filter(|l| matches!(l.status, LoanStatus::Active))
        .collect())
}

/// Cosmetic field edits only. Status transitions are the payment
/// coordinator's business (spec §3: "reverse transitions `completed →
/// active` forbidden by update, allowed only via reverse-payment").
pub async fn update_loan(
    state: &AppState,
    ctx: &DataContext,
    id: Id,
    name: Option<String>,
    category_id: Option<Option<Id>>,
    status: Option<LoanStatus>,
) -> AppResult<Loan> {
    let existing = get_loan(state, ctx, id).await?;

    if let Some(new_status) = status {
        match new_status {
            LoanStatus::Completed if existing.payments_made < existing.total_payments => {
                return Err(AppError::invariant(
                    "cannot mark loan completed before all payments are made",
                ));
            }
            LoanStatus::Active if matches!(existing.status, LoanStatus::Completed) => {
                return Err(AppError::invariant(
                    "a completed loan can only be reactivated via reverse-payment",
                ));
            }
            _ => {}
        }
    }

    let mut set = bson::Document::new();
    if let Some(n) = name {
        set.insert("name", n);
    }
    if let Some(cat) = category_id {
        set.insert("category_id", cat.map(bson::Bson::from).unwrap_or(bson::Bson::Null));
    }
    if let Some(s) = status {
        set.insert("status", bson::to_bson(&s).unwrap());
    }
    if set.is_empty() {
        return Ok(existing);
    }

    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .loans
        .update_one(filter, doc! { "$set": set })
        .await
        .map_err(anyhow::Error::from)?;
    get_loan(state, ctx, id).await
}

pub async fn delete_loan(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .loans
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("loan not found"));
    }
    Ok(())
}
