use anyhow::Result;
use bson::doc;
use futures::stream::TryStreamExt;

use crate::ids::{Id, new_id};
use crate::models::BankBalance;
use crate::tenancy::DataContext;

use super::AppState;

/// Insert a new current balance, flipping any other current row for this
/// owner scope to `false` first — spec §3 invariant: at most one
/// `is_current = true` row per owner_scope, at any moment.
pub async fn record_balance(
    state: &AppState,
    ctx: &DataContext,
    balance: rust_decimal::Decimal,
    currency: &str,
    effective_date: chrono::NaiveDate,
    notes: Option<String>,
    bank_account_id: Option<Id>,
) -> Result<BankBalance> {
    let mut filter = ctx.ownership_filter();
    filter.insert("is_current", true);
    state
        .bank_balances
        .update_many(filter, doc! { "$set": { "is_current": false } })
        .await?;

    let row = BankBalance {
        id: new_id(),
        owner: ctx.stamp(),
        balance,
        currency: currency.to_string(),
        effective_date,
        is_current: true,
        notes,
        bank_account_id,
        created_at: chrono::Utc::now(),
    };
    state.bank_balances.insert_one(&row).await?;
    Ok(row)
}

pub async fn current_balance(state: &AppState, ctx: &DataContext) -> Result<rust_decimal::Decimal> {
    let mut filter = ctx.ownership_filter();
    filter.insert("is_current", true);
    let row = state.bank_balances.find_one(filter).await?;
    Ok(row.map(|b| b.balance).unwrap_or(rust_decimal::Decimal::ZERO))
}

pub async fn list_balances(state: &AppState, ctx: &DataContext) -> Result<Vec<BankBalance>> {
    let mut cursor = state.bank_balances.find(ctx.ownership_filter()).await?;
    let mut out = Vec::new();
    while let Some(b) = cursor.try_next().await? {
        out.push(b);
    }
    out.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
    Ok(out)
}
