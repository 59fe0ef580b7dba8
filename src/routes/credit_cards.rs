// routes/credit_cards.rs
// GET    /api/v1/credit-cards       -> 200 [CreditCard]
// POST   /api/v1/credit-cards       -> 201 CreditCard
// DELETE /api/v1/credit-cards/{id}  -> 204 (deactivates)

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::{AppError, AppResult};
use crate::models::CreditCard;
use crate::money;
use crate::state::{self, AppState, NewCreditCard};
use crate::validation;

#[derive(Deserialize)]
pub struct CreateCreditCardRequest {
    pub name: String,
    pub last_four_digits: String,
    pub card_network: String,
    pub issuer: String,
    pub credit_limit: Decimal,
    pub billing_day: u32,
    pub currency: String,
    pub color: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateCreditCardRequest>,
) -> AppResult<(StatusCode, Json<CreditCard>)> {
    if !money::is_valid_amount(body.credit_limit) {
        return Err(AppError::Schema("credit_limit must be positive with at most 2 decimal places and 13 integer digits".into()));
    }
    let name = validation::validate_name(&body.name)?;
    let currency = validation::validate_currency(&body.currency)?;
    validation::validate_color(&body.color)?;
    validation::validate_billing_day(body.billing_day)?;
    let row = state::create_credit_card(
        &state,
        &rc.ctx,
        NewCreditCard {
            name,
            last_four_digits: body.last_four_digits,
            card_network: body.card_network,
            issuer: body.issuer,
            credit_limit: body.credit_limit,
            billing_day: body.billing_day,
            currency,
            color: body.color,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<CreditCard>>> {
    Ok(Json(state::list_credit_cards(&state, &rc.ctx).await?))
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::deactivate_credit_card(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
