use anyhow::{Context, Result};
use bson::doc;
use chrono::Utc;
use futures::stream::TryStreamExt;
use rand::RngCore;

use crate::ids::{Id, new_id};
use crate::models::{Session, User};

use super::AppState;

pub async fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<User>> {
    state
        .users
        .find_one(doc! { "email": email })
        .await
        .map_err(Into::into)
}

pub async fn find_user_by_username(state: &AppState, username: &str) -> Result<Option<User>> {
    state
        .users
        .find_one(doc! { "username": username })
        .await
        .map_err(Into::into)
}

pub async fn get_user_by_id(state: &AppState, id: Id) -> Result<Option<User>> {
    state.users.find_one(doc! { "_id": id }).await.map_err(Into::into)
}

pub async fn insert_user(state: &AppState, user: User) -> Result<Id> {
    let id = user.id;
    state.users.insert_one(user).await?;
    Ok(id)
}

pub async fn set_current_organization(
    state: &AppState,
    user_id: Id,
    org_id: Option<Id>,
) -> Result<()> {
    state
        .users
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "current_organization_id": org_id } },
        )
        .await?;
    Ok(())
}

/// Create an opaque bearer session token. Auth *minting* is explicitly out
/// of scope (spec §1) — this is the thinnest slice that gives the tenancy
/// layer something real to authenticate against.
pub async fn create_session(state: &AppState, user_id: Id) -> Result<String> {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = data_encoding::BASE32_NOPAD.encode(&bytes);

    let expires_at = Utc::now()
        + chrono::Duration::seconds(state.config.session_ttl_secs as i64);

    state
        .sessions
        .insert_one(Session {
            id: new_id(),
            token: token.clone(),
            user_id,
            expires_at,
        })
        .await?;

    Ok(token)
}

pub async fn find_user_by_session_token(
    state: &AppState,
    token: &str,
) -> Result<Option<User>> {
    let Some(session) = state.sessions.find_one(doc! { "token": token }).await? else {
        return Ok(None);
    };
    if session.expires_at <= Utc::now() {
        let _ = state.sessions.delete_one(doc! { "token": token }).await;
        return Ok(None);
    }
    get_user_by_id(state, session.user_id).await
}

pub async fn delete_session(state: &AppState, token: &str) -> Result<()> {
    state.sessions.delete_one(doc! { "token": token }).await?;
    Ok(())
}

pub async fn list_org_ids_for_user(state: &AppState, user_id: Id) -> Result<Vec<Id>> {
    let mut cursor = state
        .org_members
        .find(doc! { "user_id": user_id, "is_active": true })
        .await?;
    let mut ids = Vec::new();
    while let Some(m) = cursor.try_next().await? {
        ids.push(m.org_id);
    }
    Ok(ids)
}

pub async fn get_membership(
    state: &AppState,
    org_id: Id,
    user_id: Id,
) -> Result<Option<crate::models::OrgMember>> {
    state
        .org_members
        .find_one(doc! { "org_id": org_id, "user_id": user_id })
        .await
        .map_err(Into::into)
}

pub async fn require_membership(
    state: &AppState,
    org_id: Id,
    user_id: Id,
) -> Result<crate::models::OrgMember> {
    get_membership(state, org_id, user_id)
        .await?
        .filter(|m| m.is_active)
        .context("user is not an active member of this organization")
}
