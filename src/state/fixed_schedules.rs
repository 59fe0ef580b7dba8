use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{FixedSchedule, FlowType};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewFixedSchedule {
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub flow_type: FlowType,
    pub category_id: Option<Id>,
    pub day_of_month: u32,
    pub start_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
}

pub async fn create_fixed_schedule(
    state: &AppState,
    ctx: &DataContext,
    new: NewFixedSchedule,
) -> AppResult<FixedSchedule> {
    if !(1..=31).contains(&new.day_of_month) {
        return Err(AppError::invariant("day_of_month must be between 1 and 31"));
    }
    let row = FixedSchedule {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        amount: new.amount,
        currency: new.currency,
        flow_type: new.flow_type,
        category_id: new.category_id,
        day_of_month: new.day_of_month,
        start_date: new.start_date,
        end_date: new.end_date,
        is_active: true,
        paused_at: None,
        resumed_at: None,
        created_at: chrono::Utc::now(),
    };
    state
        .fixed_schedules
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_fixed_schedule(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<FixedSchedule> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .fixed_schedules
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("fixed schedule not found"))
}

pub async fn list_fixed_schedules(state: &AppState, ctx: &DataContext) -> AppResult<Vec<FixedSchedule>> {
    let mut cursor = state
        .fixed_schedules
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    Ok(out)
}

/// Active schedules within their date window, for the automation and
/// projection services (spec §4.D/§4.G).
pub async fn list_active_fixed_schedules(
    state: &AppState,
    ctx: &DataContext,
) -> AppResult<Vec<FixedSchedule>> {
    Ok(list_fixed_schedules(state, ctx)
        .await?
        .into_iter()
        .filter(|s| s.is_active)
        .collect())
}

pub async fn pause_fixed_schedule(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<FixedSchedule> {
    let existing = get_fixed_schedule(state, ctx, id).await?;
    if !existing.is_active {
        return Err(AppError::invariant("fixed schedule is already paused"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .fixed_schedules
        .update_one(
            filter,
            doc! { "$set": { "is_active": false, "paused_at": bson::to_bson(&chrono::Utc::now()).unwrap() } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    get_fixed_schedule(state, ctx, id).await
}

pub async fn resume_fixed_schedule(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<FixedSchedule> {
    let existing = get_fixed_schedule(state, ctx, id).await?;
    if existing.is_active {
        return Err(AppError::invariant("fixed schedule is already active"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .fixed_schedules
        .update_one(
            filter,
            doc! { "$set": { "is_active": true, "resumed_at": bson::to_bson(&chrono::Utc::now()).unwrap() } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    get_fixed_schedule(state, ctx, id).await
}

pub async fn delete_fixed_schedule(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .fixed_schedules
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("fixed schedule not found"));
    }
    Ok(())
}
