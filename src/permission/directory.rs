use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::models::StudentProfile;
use crate::database::Repository;
use crate::error::StatsError;
use crate::filter::Predicate;
use crate::permission::resolver::PermissionResolver;
use crate::permission::scope_filter::ScopeFilter;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// Optional narrowing on top of a teacher's scope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub search: Option<String>,
    pub college_id: Option<Uuid>,
    pub major_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl StudentQuery {
    fn extra_predicates(&self) -> Vec<Predicate> {
        let mut extra = vec![];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            extra.push(Predicate::contains("name", search));
        }
        if let Some(id) = self.college_id {
            extra.push(Predicate::eq("college_id", id.to_string()));
        }
        if let Some(id) = self.major_id {
            extra.push(Predicate::eq("major_id", id.to_string()));
        }
        if let Some(id) = self.class_id {
            extra.push(Predicate::eq("class_id", id.to_string()));
        }
        extra
    }

    /// Limit and offset, clamped to what the store accepts
    fn page(&self) -> (i64, Option<i64>) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE);
        (limit, self.offset.map(|o| o.max(0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentPage {
    pub students: Vec<StudentProfile>,
    pub total: i64,
}

pub struct StudentDirectory;

impl StudentDirectory {
    /// A page of the students `teacher_id` may see, ordered by name
    pub async fn list_visible_students(
        ctx: &RequestContext,
        teacher_id: Uuid,
        query: &StudentQuery,
    ) -> Result<StudentPage, StatsError> {
        let scope = PermissionResolver::resolve(ctx, teacher_id).await?;
        let predicate = ScopeFilter::narrow(&scope);
        let Some(filter) = ScopeFilter::student_filter(&predicate, &query.extra_predicates())? else {
            return Ok(StudentPage { students: vec![], total: 0 });
        };

        let (limit, offset) = query.page();
        let page_filter = filter.clone().order("name asc, id asc")?.limit(limit, offset)?;

        let repo = Repository::<StudentProfile>::new(ctx.store());
        let (students, total) = tokio::try_join!(
            ctx.guard(repo.select_any(page_filter)),
            ctx.guard(repo.count(filter)),
        )?;
        Ok(StudentPage { students, total })
    }

    pub async fn count_visible_students(
        ctx: &RequestContext,
        teacher_id: Uuid,
        query: &StudentQuery,
    ) -> Result<i64, StatsError> {
        let scope = PermissionResolver::resolve(ctx, teacher_id).await?;
        let predicate = ScopeFilter::narrow(&scope);
        match ScopeFilter::student_filter(&predicate, &query.extra_predicates())? {
            Some(filter) => ctx.guard(Repository::<StudentProfile>::new(ctx.store()).count(filter)).await,
            None => Ok(0),
        }
    }
}
