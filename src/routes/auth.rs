// routes/auth.rs
// POST /api/v1/auth/register { username, email, password } -> 201 User
// POST /api/v1/auth/login    { email, password }            -> 200 { access_token, user }
// POST /api/v1/auth/logout                                  -> 204

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthenticatedUser};
use crate::errors::AppResult;
use crate::models::User;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = auth::register(&state, body.username, body.email, body.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let token = auth::login(&state, &body.email, &body.password).await?;
    let user = crate::state::find_user_by_email(&state, &body.email)
        .await
        .map_err(crate::errors::AppError::Dependency)?
        .expect("user resolved by login must exist");
    Ok(Json(LoginResponse { access_token: token, user }))
}

pub async fn logout(State(state): State<Arc<AppState>>, auth: AuthenticatedUser) -> AppResult<StatusCode> {
    auth::logout(&state, &auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
