use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::models::{Class, College, Major};
use crate::database::Repository;
use crate::error::StatsError;
use crate::org::tree::{OrgTree, OrgTreeBuilder};
use crate::permission::{PermissionResolver, Scope};

pub struct OrgService;

impl OrgService {
    /// Load the reference tables and nest them
    pub async fn load_tree(ctx: &RequestContext) -> Result<OrgTree, StatsError> {
        let colleges = Repository::<College>::new(ctx.store());
        let majors = Repository::<Major>::new(ctx.store());
        let classes = Repository::<Class>::new(ctx.store());

        let (colleges, majors, classes) = tokio::try_join!(
            ctx.guard(colleges.select_any(colleges.filter()?.order("code asc")?)),
            ctx.guard(majors.select_any(majors.filter()?.order("code asc")?)),
            ctx.guard(classes.select_any(classes.filter()?.order("class_number asc, name asc")?)),
        )?;

        Ok(OrgTreeBuilder::build(colleges, majors, classes))
    }

    /// The tree pruned to what `teacher_id` may see
    pub async fn visible_tree(ctx: &RequestContext, teacher_id: Uuid) -> Result<OrgTree, StatsError> {
        let scope = PermissionResolver::resolve(ctx, teacher_id).await?;
        if scope == Scope::None {
            return Ok(OrgTree::default());
        }
        let tree = Self::load_tree(ctx).await?;
        Ok(tree.prune(&scope))
    }
}
