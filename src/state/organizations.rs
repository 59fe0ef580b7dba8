use anyhow::Result;
use bson::doc;
use futures::stream::TryStreamExt;
use slug::slugify;

use crate::ids::{Id, new_id};
use crate::models::{OrgMember, OrgRole, Organization};

use super::AppState;

pub async fn create_organization(
    state: &AppState,
    owner_id: Id,
    name: &str,
) -> Result<Organization> {
    let org = Organization {
        id: new_id(),
        name: name.to_string(),
        slug: slugify(name),
        owner_id,
        is_active: true,
        created_at: chrono::Utc::now(),
    };
    state.organizations.insert_one(&org).await?;
    state
        .org_members
        .insert_one(OrgMember {
            id: new_id(),
            org_id: org.id,
            user_id: owner_id,
            role: OrgRole::Owner,
            is_active: true,
        })
        .await?;
    Ok(org)
}

pub async fn get_organization(state: &AppState, id: Id) -> Result<Option<Organization>> {
    state
        .organizations
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn list_members(state: &AppState, org_id: Id) -> Result<Vec<OrgMember>> {
    let mut cursor = state.org_members.find(doc! { "org_id": org_id }).await?;
    let mut out = Vec::new();
    while let Some(m) = cursor.try_next().await? {
        out.push(m);
    }
    Ok(out)
}

pub async fn add_member(
    state: &AppState,
    org_id: Id,
    user_id: Id,
    role: OrgRole,
) -> Result<()> {
    let existing = state
        .org_members
        .find_one(doc! { "org_id": org_id, "user_id": user_id })
        .await?;
    if let Some(m) = existing {
        state
            .org_members
            .update_one(
                doc! { "_id": m.id },
                doc! { "$set": { "role": bson::to_bson(&role)?, "is_active": true } },
            )
            .await?;
    } else {
        state
            .org_members
            .insert_one(OrgMember {
                id: new_id(),
                org_id,
                user_id,
                role,
                is_active: true,
            })
            .await?;
    }
    Ok(())
}

pub async fn set_member_role(state: &AppState, org_id: Id, user_id: Id, role: OrgRole) -> Result<()> {
    state
        .org_members
        .update_one(
            doc! { "org_id": org_id, "user_id": user_id },
            doc! { "$set": { "role": bson::to_bson(&role)? } },
        )
        .await?;
    Ok(())
}

pub async fn remove_member(state: &AppState, org_id: Id, user_id: Id) -> Result<()> {
    state
        .org_members
        .update_one(
            doc! { "org_id": org_id, "user_id": user_id },
            doc! { "$set": { "is_active": false } },
        )
        .await?;
    Ok(())
}
