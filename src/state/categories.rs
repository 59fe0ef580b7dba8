use bson::doc;
use futures::stream::TryStreamExt;

use crate::errors::{AppError, AppResult};
use crate::ids::{Id, new_id};
use crate::models::{Category, FlowType};
use crate::tenancy::DataContext;

use super::AppState;

pub struct NewCategory {
    pub name: String,
    pub name_he: Option<String>,
    pub flow_type: FlowType,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<Id>,
    pub display_order: i32,
}

/// Unique on `(owner_scope, name, type)` among non-archived rows (spec §3).
async fn ensure_name_available(
    state: &AppState,
    ctx: &DataContext,
    name: &str,
    flow_type: FlowType,
    exclude_id: Option<Id>,
) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("name", name);
    filter.insert("type", bson::to_bson(&flow_type).unwrap());
    filter.insert("is_archived", false);
    if let Some(id) = exclude_id {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state
        .categories
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .is_some()
    {
        return Err(AppError::conflict("a category with this name and type already exists"));
    }
    Ok(())
}

pub async fn create_category(
    state: &AppState,
    ctx: &DataContext,
    new: NewCategory,
) -> AppResult<Category> {
    ensure_name_available(state, ctx, &new.name, new.flow_type, None).await?;
    let category = Category {
        id: new_id(),
        owner: ctx.stamp(),
        name: new.name,
        name_he: new.name_he,
        flow_type: new.flow_type,
        color: new.color,
        icon: new.icon,
        is_archived: false,
        parent_id: new.parent_id,
        display_order: new.display_order,
        created_at: chrono::Utc::now(),
    };
    state
        .categories
        .insert_one(&category)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(category)
}

pub async fn get_category(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Category> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .categories
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("category not found"))
}

pub async fn list_categories(state: &AppState, ctx: &DataContext) -> AppResult<Vec<Category>> {
    let mut cursor = state
        .categories
        .find(ctx.ownership_filter())
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(c) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(c);
    }
    out.sort_by_key(|c| c.display_order);
    Ok(out)
}

/// Category type cannot change while transactions reference it (spec §6
/// validation floor), and duplicate checks ignore archived rows.
pub async fn update_category(
    state: &AppState,
    ctx: &DataContext,
    id: Id,
    name: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    display_order: Option<i32>,
) -> AppResult<Category> {
    let existing = get_category(state, ctx, id).await?;
    let new_name = name.unwrap_or_else(|| existing.name.clone());
    if new_name != existing.name {
        ensure_name_available(state, ctx, &new_name, existing.flow_type, Some(id)).await?;
    }

    let mut set = doc! { "name": &new_name };
    if let Some(c) = color {
        set.insert("color", c);
    }
    if let Some(i) = icon {
        set.insert("icon", i);
    }
    if let Some(o) = display_order {
        set.insert("display_order", o);
    }

    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .categories
        .update_one(filter, doc! { "$set": set })
        .await
        .map_err(anyhow::Error::from)?;
    get_category(state, ctx, id).await
}

/// Category delete is soft if dependent transactions exist; transactions
/// linked to it remain readable (spec §4.A, §8 invariant 8).
pub async fn delete_category(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let _ = get_category(state, ctx, id).await?;

    let mut dep_filter = ctx.ownership_filter();
    dep_filter.insert("category_id", id);
    let has_dependents = state
        .transactions
        .find_one(dep_filter)
        .await
        .map_err(anyhow::Error::from)?
        .is_some();

    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    if has_dependents {
        state
            .categories
            .update_one(filter, doc! { "$set": { "is_archived": true } })
            .await
            .map_err(anyhow::Error::from)?;
    } else {
        state
            .categories
            .delete_one(filter)
            .await
            .map_err(anyhow::Error::from)?;
    }
    Ok(())
}

/// Transaction `category_id` must reference a non-archived category of
/// matching `type` (spec §4.A tie-break policy).
pub async fn ensure_category_usable(
    state: &AppState,
    ctx: &DataContext,
    category_id: Id,
    expected_flow: FlowType,
) -> AppResult<()> {
    let category = get_category(state, ctx, category_id).await?;
    if category.is_archived {
        return Err(AppError::invariant("category is archived and cannot be assigned"));
    }
    if category.flow_type != expected_flow {
        return Err(AppError::invariant("category type does not match entry type"));
    }
    Ok(())
}
