use bson::doc;
use chrono::Datelike;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::ExpectedIncome;
use crate::tenancy::DataContext;

use super::AppState;

fn month_anchor(month: chrono::NaiveDate) -> chrono::NaiveDate {
    month.with_day(1).expect("day 1 always valid")
}

/// Upsert on `(owner_scope, month)` — one expected-income row per calendar
/// month, used by the forecast engine's `expected_income` bucket (spec §4.E).
pub async fn set_expected_income(
    state: &AppState,
    ctx: &DataContext,
    month: chrono::NaiveDate,
    expected_amount: Decimal,
    notes: Option<String>,
) -> AppResult<ExpectedIncome> {
    let anchor = month_anchor(month);
    let mut filter = ctx.ownership_filter();
    filter.insert("month", bson::to_bson(&anchor).unwrap());

    let existing = state
        .expected_incomes
        .find_one(filter.clone())
        .await
        .map_err(anyhow::Error::from)?;

    if let Some(row) = existing {
        state
            .expected_incomes
            .update_one(
                doc! { "_id": row.id },
                doc! { "$set": {
                    "expected_amount": bson::to_bson(&expected_amount).unwrap(),
                    "notes": notes.clone(),
                } },
            )
            .await
            .map_err(anyhow::Error::from)?;
        return Ok(ExpectedIncome {
            expected_amount,
            notes,
            ..row
        });
    }

    let row = ExpectedIncome {
        id: new_id(),
        owner: ctx.stamp(),
        month: anchor,
        expected_amount,
        notes,
    };
    state
        .expected_incomes
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_expected_income(
    state: &AppState,
    ctx: &DataContext,
    month: chrono::NaiveDate,
) -> AppResult<Decimal> {
    let anchor = month_anchor(month);
    let mut filter = ctx.ownership_filter();
    filter.insert("month", bson::to_bson(&anchor).unwrap());
    Ok(state
        .expected_incomes
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .map(|r| r.expected_amount)
        .unwrap_or(Decimal::ZERO))
}

pub async fn list_expected_incomes(state: &AppState, ctx: &DataContext) -> AppResult<Vec<ExpectedIncome>> {
    let mut cursor = state
        .expected_incomes
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    out.sort_by_key(|r| r.month);
    Ok(out)
}

pub async fn delete_expected_income(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .expected_incomes
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("expected income entry not found"));
    }
    Ok(())
}
