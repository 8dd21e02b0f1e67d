use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{self, StatisticsConfig};
use crate::context::RequestContext;
use crate::database::models::{AssessmentStatus, StudentProfile};
use crate::error::StatsError;
use crate::org::{OrgService, OrgTree};
use crate::permission::{PermissionResolver, ScopeFilter, StudentPredicate};
use crate::statistics::aggregator::{AggregateRequest, BatchedAggregator, ScoreSource};
use crate::statistics::types::{completion_rate, AssessmentFilter, GradeGroup, GroupLevel, Overview};

/// Where one service call is; traced so a stalled request shows its last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    ResolvingPermission,
    Denied,
    Aggregating,
    Done,
}

struct PhaseTrace {
    operation: &'static str,
    caller_id: Uuid,
    teacher_id: Uuid,
    audit: bool,
    phase: Phase,
}

impl PhaseTrace {
    fn start(operation: &'static str, ctx: &RequestContext, teacher_id: Uuid, audit: bool) -> Self {
        let trace = Self { operation, caller_id: ctx.auth().user_id, teacher_id, audit, phase: Phase::Idle };
        debug!(operation, %teacher_id, phase = ?trace.phase, "statistics call");
        trace
    }

    fn enter(&mut self, phase: Phase) {
        debug!(operation = self.operation, teacher_id = %self.teacher_id, from = ?self.phase, to = ?phase, "phase");
        if self.audit && phase == Phase::Done {
            info!(
                target: "audit",
                operation = self.operation,
                caller_id = %self.caller_id,
                teacher_id = %self.teacher_id,
                denied = self.phase == Phase::Denied,
                "statistics read"
            );
        }
        self.phase = phase;
    }
}

/// Groups to report on, and granted ids the tree no longer has
struct GroupPlan {
    keys: Vec<GroupKey>,
    stale: Vec<Uuid>,
}

/// A candidate group before its students are attached
struct GroupKey {
    level: GroupLevel,
    id: Uuid,
    name: String,
    code: Option<String>,
}

pub struct StatisticsService {
    config: StatisticsConfig,
    audit: bool,
}

impl StatisticsService {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config, audit: false }
    }

    /// Uses the process-wide configuration, including its audit setting
    pub fn from_config() -> Self {
        let config = config::config();
        Self::new(config.statistics.clone()).with_audit(config.security.enable_audit_logging)
    }

    /// Log each completed call (caller, teacher, operation) under the `audit` target
    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn audit_enabled(&self) -> bool {
        self.audit
    }

    fn aggregator(&self, filter: &AssessmentFilter) -> BatchedAggregator {
        BatchedAggregator::new(&self.config).with_filter(filter.clone())
    }

    pub async fn get_overview(
        &self,
        ctx: &RequestContext,
        teacher_id: Uuid,
        filter: &AssessmentFilter,
    ) -> Result<Overview, StatsError> {
        let mut trace = PhaseTrace::start("overview", ctx, teacher_id, self.audit);

        trace.enter(Phase::ResolvingPermission);
        let scope = PermissionResolver::resolve(ctx, teacher_id).await?;
        let predicate = ScopeFilter::narrow(&scope);
        if predicate.matches_nothing() {
            trace.enter(Phase::Denied);
            trace.enter(Phase::Done);
            return Ok(Overview::default());
        }

        trace.enter(Phase::Aggregating);
        let students = ScopeFilter::students(ctx, &predicate, &[]).await?;
        let total_classes = students.iter().filter_map(|s| s.class_id).collect::<HashSet<_>>().len() as i64;
        let ids: Vec<Uuid> = students.iter().map(|s| s.id).collect();

        let results = self
            .aggregator(filter)
            .aggregate(
                ctx,
                &ids,
                &[
                    AggregateRequest::CountAll,
                    AggregateRequest::CountByStatus(AssessmentStatus::Completed),
                    AggregateRequest::CountByStatus(AssessmentStatus::InProgress),
                ],
            )
            .await?;

        let total_assessments = results.count(0);
        let completed_assessments = results.count(1);
        let overview = Overview {
            total_students: ids.len() as i64,
            total_classes,
            total_assessments,
            completed_assessments,
            in_progress_assessments: results.count(2),
            completion_rate: completion_rate(completed_assessments, total_assessments),
        };

        trace.enter(Phase::Done);
        Ok(overview)
    }

    /// Per-unit statistics at the level the teacher's scope is expressed in
    pub async fn get_grade_statistics(
        &self,
        ctx: &RequestContext,
        teacher_id: Uuid,
        filter: &AssessmentFilter,
    ) -> Result<Vec<GradeGroup>, StatsError> {
        let mut trace = PhaseTrace::start("grade_statistics", ctx, teacher_id, self.audit);

        trace.enter(Phase::ResolvingPermission);
        let scope = PermissionResolver::resolve(ctx, teacher_id).await?;
        let predicate = ScopeFilter::narrow(&scope);
        if predicate.matches_nothing() {
            trace.enter(Phase::Denied);
            trace.enter(Phase::Done);
            return Ok(vec![]);
        }

        trace.enter(Phase::Aggregating);
        let (tree, students) = tokio::try_join!(
            OrgService::load_tree(ctx),
            ScopeFilter::students(ctx, &predicate, &[]),
        )?;

        let GroupPlan { keys, stale } = Self::group_keys(&tree, &predicate);
        for id in stale {
            Self::absorb(StatsError::inconsistent(format!("granted id {id} not in org tree")));
        }
        let level = keys.first().map(|k| k.level);
        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for student in &students {
            if let Some(group_id) = level.and_then(|level| Self::placement(student, level)) {
                members.entry(group_id).or_default().push(student.id);
            }
        }

        let aggregator = self.aggregator(filter);
        let requests = [
            AggregateRequest::CountAll,
            AggregateRequest::CountByStatus(AssessmentStatus::Completed),
            AggregateRequest::Scores {
                status: Some(AssessmentStatus::Completed),
                source: ScoreSource::raw_scores(),
            },
        ];

        let mut groups = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(ids) = members.get(&key.id).filter(|ids| !ids.is_empty()) else {
                continue;
            };
            let results = aggregator.aggregate(ctx, ids, &requests).await?;
            let total_assessments = results.count(0);
            let completed_assessments = results.count(1);
            let scores = results.scores(2);
            groups.push(GradeGroup {
                level: key.level,
                id: key.id,
                name: key.name,
                code: key.code,
                student_count: ids.len() as i64,
                total_assessments,
                completed_assessments,
                completion_rate: completion_rate(completed_assessments, total_assessments),
                avg_score: scores.avg,
                min_score: scores.min,
                max_score: scores.max,
            });
        }

        trace.enter(Phase::Done);
        Ok(groups)
    }

    /// Candidate groups in output order, plus granted ids missing from the tree
    fn group_keys(tree: &OrgTree, predicate: &StudentPredicate) -> GroupPlan {
        let mut stale = vec![];
        let keys = match predicate {
            StudentPredicate::Empty => vec![],
            StudentPredicate::Unrestricted => Self::college_keys(tree),
            StudentPredicate::ByCollege(college_ids) => {
                stale.extend(college_ids.iter().copied().filter(|id| tree.find_college(*id).is_none()));
                Self::college_keys(tree)
            }
            StudentPredicate::ByMajor(major_ids) => {
                let mut owning = BTreeSet::new();
                for id in major_ids {
                    match tree.find_major(*id) {
                        Some((college, _)) => {
                            owning.insert(college.id);
                        }
                        None => stale.push(*id),
                    }
                }
                tree.majors_under(&owning)
                    .into_iter()
                    .map(|major| GroupKey {
                        level: GroupLevel::Major,
                        id: major.id,
                        name: major.name.clone(),
                        code: Some(major.code.clone()),
                    })
                    .collect()
            }
            StudentPredicate::ByClass(class_ids) => {
                let mut keys = vec![];
                for id in class_ids {
                    match tree.find_class(*id) {
                        Some(class) => keys.push(GroupKey {
                            level: GroupLevel::Class,
                            id: class.id,
                            name: class.name.clone(),
                            code: None,
                        }),
                        None => stale.push(*id),
                    }
                }
                keys.sort_by(|a: &GroupKey, b: &GroupKey| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                keys
            }
        };
        GroupPlan { keys, stale }
    }

    fn college_keys(tree: &OrgTree) -> Vec<GroupKey> {
        tree.colleges
            .iter()
            .map(|node| GroupKey {
                level: GroupLevel::College,
                id: node.college.id,
                name: node.college.name.clone(),
                code: Some(node.college.code.clone()),
            })
            .collect()
    }

    fn placement(student: &StudentProfile, level: GroupLevel) -> Option<Uuid> {
        match level {
            GroupLevel::College => student.college_id,
            GroupLevel::Major => student.major_id,
            GroupLevel::Class => student.class_id,
        }
    }

    fn absorb(err: StatsError) {
        warn!(kind = ?err.kind(), "{err}, skipping group");
    }
}
