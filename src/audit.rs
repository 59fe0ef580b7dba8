//! Thin orchestration above `state::audit` (spec §4.L): derives
//! `user_id`/`organization_id` from the request's `DataContext` so
//! coordinators don't thread them through by hand.

use serde::Serialize;

use crate::errors::AppResult;
use crate::ids::Id;
use crate::state::{self, AppState};
use crate::tenancy::DataContext;

fn to_json<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

/// Record one audit row for `action` on `entity_type`/`entity_id`. Either
/// side of the diff may be omitted — creates have no `old`, deletes have
/// no `new`.
pub async fn log_action<O: Serialize, N: Serialize>(
    state: &AppState,
    ctx: &DataContext,
    entity_type: &str,
    entity_id: Id,
    action: &str,
    old: Option<&O>,
    new: Option<&N>,
) -> AppResult<()> {
    state::record_audit(
        state,
        entity_type,
        entity_id,
        ctx.user_id,
        action,
        old.and_then(to_json),
        new.and_then(to_json),
        ctx.organization_id,
    )
    .await
}
