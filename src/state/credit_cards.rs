use bson::doc;
use futures::stream::TryStreamExt;
use rust_decimal::Decimal;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::CreditCard;
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewCreditCard {
    pub name: String,
    pub last_four_digits: String,
    pub card_network: String,
    pub issuer: String,
    pub credit_limit: Decimal,
    pub billing_day: u32,
    pub currency: String,
    pub color: String,
}

pub async fn create_credit_card(
    state: &AppState,
    ctx: &DataContext,
    new: NewCreditCard,
) -> AppResult<CreditCard> {
    if !(1..=28).contains(&new.billing_day) {
        return Err(AppError::invariant("billing_day must be between 1 and 28"));
    }
    let row = CreditCard {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        last_four_digits: new.last_four_digits,
        card_network: new.card_network,
        issuer: new.issuer,
        credit_limit: new.credit_limit,
        billing_day: new.billing_day,
        currency: new.currency,
        is_active: true,
        color: new.color,
        created_at: chrono::Utc::now(),
    };
    state
        .credit_cards
        .insert_one(&row)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(row)
}

pub async fn get_credit_card(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<CreditCard> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .credit_cards
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("credit card not found"))
}

pub async fn list_credit_cards(state: &AppState, ctx: &DataContext) -> AppResult<Vec<CreditCard>> {
    let mut cursor = state
        .credit_cards
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(r) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(r);
    }
    Ok(out)
}

pub async fn deactivate_credit_card(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    let result = state
        .credit_cards
        .update_one(filter, doc! { "$set": { "is_active": false } })
        .await
        .map_err(anyhow::Error::from)?;
    if result.matched_count == 0 {
        return Err(AppError::not_found("credit card not found"));
    }
    Ok(())
}
