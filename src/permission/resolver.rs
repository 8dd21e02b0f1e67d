use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::models::{GrantLevel, PermissionGrant};
use crate::database::Repository;
use crate::error::StatsError;
use crate::filter::Predicate;

/// Visibility boundary a teacher's grants confer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    All,
    /// The teacher holds no grants at all
    None,
    Restricted {
        college_ids: BTreeSet<Uuid>,
        major_ids: BTreeSet<Uuid>,
        class_ids: BTreeSet<Uuid>,
    },
}

pub struct PermissionResolver;

impl PermissionResolver {
    pub async fn resolve(ctx: &RequestContext, teacher_id: Uuid) -> Result<Scope, StatsError> {
        if ctx.auth().is_superuser() {
            debug!(%teacher_id, "superuser caller, scope is unrestricted");
            return Ok(Scope::All);
        }

        let grants = Self::grants_for(ctx, teacher_id).await?;
        let scope = Self::scope_from_grants(&grants);
        debug!(%teacher_id, grants = grants.len(), ?scope, "resolved scope");
        Ok(scope)
    }

    /// Raw grant rows for a teacher, ordered by level
    pub async fn grants_for(ctx: &RequestContext, teacher_id: Uuid) -> Result<Vec<PermissionGrant>, StatsError> {
        let repo = Repository::<PermissionGrant>::new(ctx.store());
        let filter = repo.filter()?.with(Predicate::eq("teacher_id", teacher_id.to_string()));
        let mut grants = ctx.guard(repo.select_any(filter)).await?;
        grants.sort_by_key(|g| g.level);
        Ok(grants)
    }

    /// Most-permissive wins: one school grant makes the scope unrestricted.
    pub fn scope_from_grants(grants: &[PermissionGrant]) -> Scope {
        if grants.is_empty() {
            return Scope::None;
        }
        if grants.iter().any(|g| g.level == GrantLevel::School) {
            return Scope::All;
        }

        let mut college_ids = BTreeSet::new();
        let mut major_ids = BTreeSet::new();
        let mut class_ids = BTreeSet::new();
        for grant in grants {
            let Some(target) = grant.target_id() else {
                warn!(grant_id = %grant.id, level = grant.level.as_str(), "grant carries no id for its level, ignoring");
                continue;
            };
            match grant.level {
                GrantLevel::College => college_ids.insert(target),
                GrantLevel::Major => major_ids.insert(target),
                GrantLevel::Class => class_ids.insert(target),
                GrantLevel::School => continue,
            };
        }

        Scope::Restricted { college_ids, major_ids, class_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::grant;

    #[test]
    fn no_grants_is_none() {
        assert_eq!(PermissionResolver::scope_from_grants(&[]), Scope::None);
    }

    #[test]
    fn school_grant_overrides_everything() {
        let teacher = Uuid::new_v4();
        let grants = vec![
            grant(teacher, GrantLevel::Class, Some(Uuid::new_v4())),
            grant(teacher, GrantLevel::School, None),
            grant(teacher, GrantLevel::Major, Some(Uuid::new_v4())),
        ];
        assert_eq!(PermissionResolver::scope_from_grants(&grants), Scope::All);
    }

    #[test]
    fn partitions_and_dedups_by_level() {
        let teacher = Uuid::new_v4();
        let (m, k1, k2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let grants = vec![
            grant(teacher, GrantLevel::Class, Some(k1)),
            grant(teacher, GrantLevel::Class, Some(k1)),
            grant(teacher, GrantLevel::Class, Some(k2)),
            grant(teacher, GrantLevel::Major, Some(m)),
        ];
        let Scope::Restricted { college_ids, major_ids, class_ids } = PermissionResolver::scope_from_grants(&grants) else {
            panic!("expected restricted scope");
        };
        assert!(college_ids.is_empty());
        assert_eq!(major_ids, BTreeSet::from([m]));
        assert_eq!(class_ids, BTreeSet::from([k1, k2]));
    }

    #[test]
    fn malformed_grants_are_skipped() {
        let teacher = Uuid::new_v4();
        let grants = vec![grant(teacher, GrantLevel::College, None)];
        assert_eq!(
            PermissionResolver::scope_from_grants(&grants),
            Scope::Restricted {
                college_ids: BTreeSet::new(),
                major_ids: BTreeSet::new(),
                class_ids: BTreeSet::new(),
            }
        );
    }
}
