use std::collections::BTreeSet;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::models::{StudentProfile, Table};
use crate::database::Repository;
use crate::error::StatsError;
use crate::filter::{Filter, Predicate};
use crate::permission::resolver::Scope;

/// Which students a scope lets through, after level stripping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentPredicate {
    Unrestricted,
    ByClass(BTreeSet<Uuid>),
    ByMajor(BTreeSet<Uuid>),
    ByCollege(BTreeSet<Uuid>),
    /// Matches nothing
    Empty,
}

impl StudentPredicate {
    pub fn matches_nothing(&self) -> bool {
        matches!(self, StudentPredicate::Empty)
    }

    /// Store predicates selecting visible student profiles; `None` when nothing can match.
    pub fn to_predicates(&self) -> Option<Vec<Predicate>> {
        let mut predicates = vec![Predicate::eq("role", "student")];
        let (column, ids) = match self {
            StudentPredicate::Empty => return None,
            StudentPredicate::Unrestricted => return Some(predicates),
            StudentPredicate::ByClass(ids) => ("class_id", ids),
            StudentPredicate::ByMajor(ids) => ("major_id", ids),
            StudentPredicate::ByCollege(ids) => ("college_id", ids),
        };
        predicates.push(Predicate::in_list(column, ids.iter().map(|id| id.to_string())));
        Some(predicates)
    }
}

pub struct ScopeFilter;

impl ScopeFilter {
    /// Most specific non-empty level wins; broader levels are ignored, not unioned.
    pub fn narrow(scope: &Scope) -> StudentPredicate {
        match scope {
            Scope::All => StudentPredicate::Unrestricted,
            Scope::None => StudentPredicate::Empty,
            Scope::Restricted { college_ids, major_ids, class_ids } => {
                if !class_ids.is_empty() {
                    StudentPredicate::ByClass(class_ids.clone())
                } else if !major_ids.is_empty() {
                    StudentPredicate::ByMajor(major_ids.clone())
                } else if !college_ids.is_empty() {
                    StudentPredicate::ByCollege(college_ids.clone())
                } else {
                    StudentPredicate::Empty
                }
            }
        }
    }

    /// Visible students' org placement (id and college/major/class ids), with
    /// `extra` predicates AND'ed on top. An empty predicate never reaches the store.
    pub async fn students(
        ctx: &RequestContext,
        predicate: &StudentPredicate,
        extra: &[Predicate],
    ) -> Result<Vec<StudentProfile>, StatsError> {
        let Some(filter) = Self::student_filter(predicate, extra)? else {
            return Ok(vec![]);
        };
        let filter = filter.select(["id", "role", "college_id", "major_id", "class_id"])?;
        let repo = Repository::<StudentProfile>::new(ctx.store());
        ctx.guard(repo.select_any(filter)).await
    }

    pub async fn student_ids(ctx: &RequestContext, predicate: &StudentPredicate) -> Result<Vec<Uuid>, StatsError> {
        Ok(Self::students(ctx, predicate, &[]).await?.into_iter().map(|s| s.id).collect())
    }

    pub(crate) fn student_filter(
        predicate: &StudentPredicate,
        extra: &[Predicate],
    ) -> Result<Option<Filter>, StatsError> {
        let Some(predicates) = predicate.to_predicates() else {
            return Ok(None);
        };
        let filter = Filter::new(StudentProfile::TABLE)?
            .with_all(predicates)
            .with_all(extra.iter().cloned());
        Ok(Some(filter))
    }
}
