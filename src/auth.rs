//! Minimal auth slice (spec §4.I / §6): register, login, and the Bearer
//! extractor the route layer builds a `DataContext` from. Token minting
//! and password hashing are intentionally the thinnest thing that gives
//! the tenancy layer something real to authenticate against, not a
//! hardened auth system (spec's Non-goals).

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::ids::Id;
use crate::models::User;
use crate::state::{self, AppState};
use crate::tenancy::DataContext;
use crate::validation;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    data_encoding::HEXLOWER.encode(&hasher.finalize())
}

fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}

pub async fn register(
    state: &AppState,
    username: String,
    email: String,
    password: String,
) -> AppResult<User> {
    if username.trim().is_empty() || email.trim().is_empty() {
        return Err(AppError::invariant("username and email must not be empty"));
    }
    validation::validate_password_strength(&password)?;
    if state::find_user_by_email(state, &email)
        .await
        .map_err(AppError::Dependency)?
        .is_some()
    {
        return Err(AppError::conflict("email is already registered"));
    }
    if state::find_user_by_username(state, &username)
        .await
        .map_err(AppError::Dependency)?
        .is_some()
    {
        return Err(AppError::conflict("username is already taken"));
    }

    let user = User {
        id: crate::ids::new_id(),
        username,
        email,
        password_hash: hash_password(&password),
        is_admin: false,
        is_super_admin: false,
        is_active: true,
        current_organization_id: None,
        created_at: chrono::Utc::now(),
    };
    state::insert_user(state, user.clone())
        .await
        .map_err(AppError::Dependency)?;
    Ok(user)
}

/// Returns the bearer token on success; the caller hands it back to the
/// client as the `Authorization: Bearer <token>` credential for every
/// subsequent request.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<String> {
    let user = state::find_user_by_email(state, email)
        .await
        .map_err(AppError::Dependency)?
        .ok_or_else(|| AppError::Auth("invalid email or password".into()))?;
    if !user.is_active || !verify_password(password, &user.password_hash) {
        return Err(AppError::Auth("invalid email or password".into()));
    }
    state::create_session(state, user.id)
        .await
        .map_err(AppError::Dependency)
}

pub async fn logout(state: &AppState, token: &str) -> AppResult<()> {
    state::delete_session(state, token).await.map_err(AppError::Dependency)
}

/// The authenticated principal, extracted from `Authorization: Bearer`.
/// Route handlers resolve `organization_id` separately (a header or path
/// param) and build a `DataContext` from `user.id` plus that choice.
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AppState>: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Auth("missing bearer token".into()))?;
        let app_state = Arc::<AppState>::from_ref(state);
        let user = state::find_user_by_session_token(&app_state, &token)
            .await
            .map_err(AppError::Dependency)?
            .ok_or_else(|| AppError::Auth("session expired or invalid".into()))?;
        Ok(AuthenticatedUser { user, token })
    }
}

/// Resolve the caller's role within `org_id`, failing closed
/// (`Permission`) rather than defaulting to any implicit capability.
pub async fn role_in_organization(state: &AppState, user_id: Id, org_id: Id) -> AppResult<crate::models::OrgRole> {
    let membership = state::get_membership(state, org_id, user_id)
        .await
        .map_err(AppError::Dependency)?
        .filter(|m| m.is_active)
        .ok_or_else(|| AppError::Permission("not an active member of this organization".into()))?;
    Ok(membership.role)
}

/// The authenticated principal plus the `DataContext` its request
/// resolved to. When the `X-Organization-Id` header is present and the
/// caller is an active member, scope is organizational; otherwise
/// personal. Membership is re-checked on every request — roles can
/// change between calls.
pub struct RequestContext {
    pub user: User,
    pub ctx: DataContext,
    pub role: Option<crate::models::OrgRole>,
}

impl<S> FromRequestParts<S> for RequestContext
where
    Arc<AppState>: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser { user, .. } = AuthenticatedUser::from_request_parts(parts, state).await?;
        let app_state = Arc::<AppState>::from_ref(state);

        let org_header = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());

        match org_header {
            Some(org_id) => {
                let role = role_in_organization(&app_state, user.id, org_id).await?;
                Ok(RequestContext {
                    ctx: DataContext::organizational(user.id, org_id),
                    role: Some(role),
                    user,
                })
            }
            None => Ok(RequestContext {
                ctx: DataContext::personal(user.id),
                role: None,
                user,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrips() {
        let hash = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }
}
