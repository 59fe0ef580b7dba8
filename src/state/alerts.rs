use bson::doc;
use futures::stream::TryStreamExt;

use crate::errors::{AppError, AppResult};
use crate::ids::Id;
use crate::models::{Alert, AlertSeverity};
use crate::tenancy::DataContext;

use super::AppState;

/// All non-dismissed alerts whose `alert_type` is one of `types`, used by
/// the alert engine to bucket the existing rows of a family by key before
/// reconciling (spec §4.H regeneration protocol step 1).
pub async fn list_non_dismissed_by_types(
    state: &AppState,
    ctx: &DataContext,
    types: &[&str],
) -> AppResult<Vec<Alert>> {
    let mut filter = ctx.ownership_filter();
    filter.insert("alert_type", doc! { "$in": types });
    filter.insert("is_dismissed", false);
    let mut cursor = state.alerts.find(filter).await.map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(alert) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(alert);
    }
    Ok(out)
}

pub async fn insert_alert(state: &AppState, alert: &Alert) -> AppResult<()> {
    state.alerts.insert_one(alert).await.map_err(anyhow::Error::from)?;
    Ok(())
}

/// Overwrite `title`/`message`/`severity` in place, leaving `is_read` and
/// `created_at` untouched (spec §4.H regeneration protocol step 3).
pub async fn refresh_alert_fields(
    state: &AppState,
    ctx: &DataContext,
    id: Id,
    title: &str,
    message: &str,
    severity: AlertSeverity,
) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .alerts
        .update_one(
            filter,
            doc! { "$set": {
                "title": title,
                "message": message,
                "severity": bson::to_bson(&severity).unwrap(),
            } },
        )
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

pub async fn delete_alert_by_id(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<()> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state.alerts.delete_one(filter).await.map_err(anyhow::Error::from)?;
    Ok(())
}

pub async fn list_alerts(
    state: &AppState,
    ctx: &DataContext,
    include_dismissed: bool,
) -> AppResult<Vec<Alert>> {
    let mut filter = ctx.ownership_filter();
    if !include_dismissed {
        filter.insert("is_dismissed", false);
    }
    let mut cursor = state.alerts.find(filter).await.map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(alert) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(alert);
    }
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(out)
}

pub async fn get_alert(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Alert> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .alerts
        .find_one(filter)
        .await
        .map_err(anyhow::Error::from)?
        .ok_or_else(|| AppError::not_found("alert not found"))
}

pub async fn mark_alert_read(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Alert> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .alerts
        .update_one(filter, doc! { "$set": { "is_read": true } })
        .await
        .map_err(anyhow::Error::from)?;
    get_alert(state, ctx, id).await
}

pub async fn dismiss_alert(state: &AppState, ctx: &DataContext, id: Id) -> AppResult<Alert> {
    let mut filter = ctx.ownership_filter();
    filter.insert("_id", id);
    state
        .alerts
        .update_one(filter, doc! { "$set": { "is_dismissed": true } })
        .await
        .map_err(anyhow::Error::from)?;
    get_alert(state, ctx, id).await
}
