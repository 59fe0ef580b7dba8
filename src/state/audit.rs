use bson::doc;
use futures::stream::TryStreamExt;

use crate::errors::AppResult;
use crate::ids::{Id, new_id};
use crate::models::AuditLogEntry;

use super::AppState;

/// One audit row per significant change: balance changes, transactions
/// >= 10000, loan status/payment changes, and (spec SPEC_FULL.md §B) one
/// row per affected entity on bulk transaction operations.
pub async fn record_audit(
    state: &AppState,
    table_name: &str,
    record_id: Id,
    user_id: Id,
    action: &str,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    organization_id: Option<Id>,
) -> AppResult<()> {
    let entry = AuditLogEntry {
        id: new_id(),
        table_name: table_name.to_string(),
        record_id,
        user_id,
        action: action.to_string(),
        old_values,
        new_values,
        changed_at: chrono::Utc::now(),
        organization_id,
    };
    state
        .audit_log
        .insert_one(&entry)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

/// Scoped to org admins at the route layer (spec SPEC_FULL.md §B).
pub async fn list_audit_log(
    state: &AppState,
    organization_id: Id,
    table_name: Option<&str>,
) -> AppResult<Vec<AuditLogEntry>> {
    let mut filter = doc! { "organization_id": organization_id };
    if let Some(t) = table_name {
        filter.insert("table_name", t);
    }
    let mut cursor = state
        .audit_log
        .find(filter)
        .await
        .map_err(anyhow::Error::from)?;
    let mut out = Vec::new();
    while let Some(e) = cursor.try_next().await.map_err(anyhow::Error::from)? {
        out.push(e);
    }
    out.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
    Ok(out)
}
