use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{BillingCycle, Subscription};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewSubscription {
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_renewal_date: chrono::NaiveDate,
    pub auto_renew: bool,
    pub provider: String,
    pub credit_card_id: Option<Id>,
    pub category_id: Option<Id>,
}

pub async fn create_subscription(
    state: &AppState,
    ctx: &DataContext,
    new: NewSubscription,
) -> AppResult<Subscription> {
    let row = Subscription {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        amount: new.amount,
        currency: new.currency,
        billing_cycle: new.billing_cycle,
        next_renewal_date: new.next_renewal_date,
        is_active: true,
        paused_at: None,
        auto_renew: new.auto_renew,
        provider: new.provider,
        credit_card_id: new.credit_card_id,
        category_id: new.category_id,
        created_at: chrono::Utc::now(),
    };
    state
        .subscriptions
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_subscription(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Subscription> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .subscriptions
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("subscription not found"))
}

pub async fn list_subscriptions(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Subscription>> {
    let mut cursor = state
        .subscriptions
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    Ok(out)
}

pub async fn list_active_subscriptions(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Subscription>> {
    Ok(list_subscriptions(state, ctx)
        .await?
        .into_iter()
        .filter(|s| s.is_active)
        .collect())
}

pub async fn pause_subscription(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Subscription> {
    let existing = get_subscription(state, ctx, id).await?;
    if !existing.is_active {
        return Err(AppError::invariant("subscription is already paused"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .subscriptions
        .update_one(
            filter,
            doc! { "$set": { "is_active": false, "paused_at": bson::to_bson(&chrono::Utc::now()).unwrap() } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    get_subscription(state, ctx, id).await
}

pub async fn resume_subscription(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Subscription> {
    let existing = get_subscription(state, ctx, id).await?;
    if existing.is_active {
        return Err(AppError::invariant("subscription is already active"));
    }
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .subscriptions
        .update_one(filter, doc! { "$set": { "is_active": true, "paused_at": bson::Bson::Null } })
        .await
        .map_err(anyhow::Error::from)?;
    get_subscription(state, ctx, id).await
}

pub async fn delete_subscription(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .subscriptions
        .delete_one(filter)
        .await
        .map_err(anyhow::Error::from)?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("subscription not found"));
    }
    Ok(())
}
