// routes/categories.rs
// GET    /api/v1/categories           -> 200 [Category]
// POST   /api/v1/categories           -> 201 Category
// PATCH  /api/v1/categories/{id}      -> 200 Category
// DELETE /api/v1/categories/{id}      -> 204 (soft-archives if referenced)

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::AppResult;
use crate::models::{Category, FlowType};
use crate::state::{self, AppState, NewCategory};
use crate::validation;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub name_he: Option<String>,
    pub flow_type: FlowType,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub display_order: i32,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Json(body): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let name = validation::validate_name(&body.name)?;
    validation::validate_color(&body.color)?;
    let category = state::create_category(
        &state,
        &rc.ctx,
        NewCategory {
            name,
            name_he: body.name_he,
            flow_type: body.flow_type,
            color: body.color,
            icon: body.icon,
            parent_id: body.parent_id,
            display_order: body.display_order,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list(State(state): State<Arc<AppState>>, rc: RequestContext) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state::list_categories(&state, &rc.ctx).await?))
}

#[derive(Deserialize, Default)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategoryRequest>,
) -> AppResult<Json<Category>> {
    let name = body.name.map(|n| validation::validate_name(&n)).transpose()?;
    if let Some(color) = &body.color {
        validation::validate_color(color)?;
    }
    let category = state::update_category(&state, &rc.ctx, id, name, body.color, body.icon, body.display_order).await?;
    Ok(Json(category))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    rc: RequestContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state::delete_category(&state, &rc.ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
