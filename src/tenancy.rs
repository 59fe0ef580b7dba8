//! DataContext, the ownership filter combinator, and role capability checks
//! (spec §4.I, design note: "thread it explicitly, never ambient state").

use bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ids::Id;
use crate::models::OrgRole;

/// Built fresh on every authenticated request from the principal and
/// their current organization. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataContext {
    pub user_id: Id,
    pub organization_id: Option<Id>,
}

impl DataContext {
    pub fn personal(user_id: Id) -> Self {
        DataContext {
            user_id,
            organization_id: None,
        }
    }

    pub fn organizational(user_id: Id, organization_id: Id) -> Self {
        DataContext {
            user_id,
            organization_id: Some(organization_id),
        }
    }

    pub fn is_org_context(&self) -> bool {
        self.organization_id.is_some()
    }

    /// The ownership filter (spec §3 DataContext): personal rows match on
    /// `user_id` with no org; org rows match on `organization_id` alone.
    /// Every scoped query must start from this — modeled as a predicate
    /// that composes with other filters rather than a runtime afterthought.
    pub fn ownership_filter(&self) -> Document {
        match self.organization_id {
            Some(org_id) => doc! { "organization_id": org_id },
            None => doc! {
                "user_id": self.user_id,
                "organization_id": bson::Bson::Null,
            },
        }
    }

    /// The owner-scope fields to stamp on a newly created row.
    pub fn stamp(&self) -> crate::models::OwnerScope {
        crate::models::OwnerScope {
            user_id: self.user_id,
            organization_id: self.organization_id,
        }
    }
}

/// Required roles by action (spec §4.I). Call at the coordinator/route
/// boundary before any mutation; cross-tenant access must already have
/// failed as `NotFound` by the time a capability check runs.
pub fn require_role(role: &OrgRole, floor: OrgRole) -> Result<(), AppError> {
    if role.at_least(floor) {
        Ok(())
    } else {
        Err(AppError::permission(format!(
            "requires {floor:?} or higher"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn personal_filter_excludes_org_rows() {
        let ctx = DataContext::personal(Uuid::new_v4());
        let filter = ctx.ownership_filter();
        assert!(filter.get("user_id").is_some());
        assert_eq!(filter.get("organization_id"), Some(&bson::Bson::Null));
    }

    #[test]
    fn org_filter_matches_on_org_id_only() {
        let org = Uuid::new_v4();
        let ctx = DataContext::organizational(Uuid::new_v4(), org);
        let filter = ctx.ownership_filter();
        assert!(filter.get("user_id").is_none());
        assert!(filter.get("organization_id").is_some());
    }

    #[test]
    fn role_ranking_is_strict() {
        assert!(OrgRole::Owner.at_least(OrgRole::Admin));
        assert!(!OrgRole::Viewer.at_least(OrgRole::Member));
        assert!(OrgRole::Member.at_least(OrgRole::Member));
    }
}
