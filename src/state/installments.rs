use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{FlowType, Installment};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewInstallment {
    pub name: String,
    pub total_amount: Decimal,
    pub monthly_amount: Decimal,
    pub number_of_payments: u32,
    pub flow_type: FlowType,
    pub category_id: Option<Id>,
    pub start_date: chrono::NaiveDate,
    pub day_of_month: u32,
    pub currency: String,
    pub original_amount: Option<Decimal>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
}

pub async fn create_installment(
    state: &AppState,
    ctx: &DataContext,
    new: NewInstallment,
) -> AppResult<Installment> {
    if new.number_of_payments == 0 {
        return Err(AppError::invariant("number_of_payments must be at least 1"));
    }
    let row = Installment {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        total_amount: new.total_amount,
        monthly_amount: new.monthly_amount,
        number_of_payments: new.number_of_payments,
        payments_completed: 0,
        flow_type: new.flow_type,
        category_id: new.category_id,
        start_date: new.start_date,
        day_of_month: new.day_of_month,
        currency: new.currency,
        original_amount: new.original_amount,
        original_currency: new.original_currency,
        exchange_rate: new.exchange_rate,
        created_at: chrono::Utc::now(),
    };
    state
        .installments
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_installment(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Installment> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .installments
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("installment not found"))
}

pub async fn list_installments(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Installment>> {
    let mut cursor = state
        .installments
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    Ok(out)
}

pub fn is_complete(installment: &Installment) -> bool {
    installment.payments_completed >= installment.number_of_payments
}

/// Advance the completed-payment counter by one. Errors if already
/// complete (spec §4.J terminal-state guard, mirrored from loan payments).
pub async fn record_installment_payment(
    state: &AppState,
    ctx: &DataContext,
    id: Id,
) -> AppResult<Installment> {
    let existing = get_installment(state, ctx, id).await?;
    if is_complete(&existing) {
        return Err(AppError::invariant("installment plan is already complete"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    filter.insert(
        "payments_completed",
        bson::to_bson(&existing.payments_completed).unwrap(),
    );
    let result = state
        .installments
        .update_one(filter, doc! { "$inc": { "payments_completed": 1i32 } })
        .await
        .map_err(anyhow::Error::from)?;
    if result.modified_count == 0 {
        return Err(AppError::conflict("installment was modified concurrently, retry"));
    }
    get_installment(state, ctx, id).await
}

pub async fn delete_installment(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .installments
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("installment not found"));
    }
    Ok(())
}
