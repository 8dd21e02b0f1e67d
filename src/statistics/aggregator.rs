use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::StatisticsConfig;
use crate::context::RequestContext;
use crate::database::models::{Assessment, AssessmentStatus, Table, SCORE_FIELDS};
use crate::error::StatsError;
use crate::filter::{Filter, Predicate};
use crate::statistics::types::{round2, AssessmentFilter};

/// Where a numeric score lives in an assessment row, with ordered fallback keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSource {
    column: &'static str,
    keys: &'static [&'static str],
}

impl ScoreSource {
    /// `raw_scores.total_score`, falling back to `raw_scores.final_score`
    pub fn raw_scores() -> Self {
        Self { column: "raw_scores", keys: &SCORE_FIELDS }
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Value of the first key present and non-null. A non-numeric value there
    /// yields no score; later keys are only consulted when earlier ones are absent.
    pub fn extract(&self, row: &Value) -> Option<f64> {
        let scores = row.get(self.column)?;
        self.keys
            .iter()
            .find_map(|key| scores.get(key).filter(|v| !v.is_null()))?
            .as_f64()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateRequest {
    CountAll,
    CountByStatus(AssessmentStatus),
    Scores {
        status: Option<AssessmentStatus>,
        source: ScoreSource,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub samples: usize,
}

impl ScoreSummary {
    pub fn from_values(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        // Sorted so the sum, and therefore the mean, does not depend on batch boundaries
        values.sort_by(f64::total_cmp);
        let sum: f64 = values.iter().sum();
        Self {
            avg: Some(round2(sum / values.len() as f64)),
            min: values.first().copied(),
            max: values.last().copied(),
            samples: values.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Count(i64),
    Scores(ScoreSummary),
}

/// Merged results, one per request, in request order
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResults {
    values: Vec<AggregateValue>,
}

impl AggregateResults {
    pub fn values(&self) -> &[AggregateValue] {
        &self.values
    }

    pub fn count(&self, index: usize) -> i64 {
        match self.values.get(index) {
            Some(AggregateValue::Count(n)) => *n,
            _ => 0,
        }
    }

    pub fn scores(&self, index: usize) -> ScoreSummary {
        match self.values.get(index) {
            Some(AggregateValue::Scores(summary)) => summary.clone(),
            _ => ScoreSummary::default(),
        }
    }
}

/// One batch's contribution to one request
enum Partial {
    Count(i64),
    Values(Vec<f64>),
}

/// Runs assessment aggregates over student id sets in bounded batches.
///
/// Each batch becomes one `user_id IN (...)` list, keeping request size under
/// the store's transport limit. Batches run concurrently up to the configured
/// bound and are merged only once every batch has succeeded.
pub struct BatchedAggregator {
    batch_size: usize,
    concurrency: usize,
    filter: AssessmentFilter,
}

impl BatchedAggregator {
    pub fn new(config: &StatisticsConfig) -> Self {
        Self {
            batch_size: config.effective_batch_size(),
            concurrency: config.effective_concurrency(),
            filter: AssessmentFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: AssessmentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn aggregate(
        &self,
        ctx: &RequestContext,
        student_ids: &[Uuid],
        requests: &[AggregateRequest],
    ) -> Result<AggregateResults, StatsError> {
        ctx.ensure_active()?;
        if student_ids.is_empty() || requests.is_empty() {
            return Ok(Self::merge(requests, vec![]));
        }

        let batches: Vec<&[Uuid]> = student_ids.chunks(self.batch_size).collect();
        debug!(
            students = student_ids.len(),
            batches = batches.len(),
            requests = requests.len(),
            "aggregating assessments"
        );

        let partials: Vec<Vec<Partial>> = stream::iter(batches)
            .map(|batch| self.run_batch(ctx, batch, requests))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(Self::merge(requests, partials))
    }

    async fn run_batch(
        &self,
        ctx: &RequestContext,
        batch: &[Uuid],
        requests: &[AggregateRequest],
    ) -> Result<Vec<Partial>, StatsError> {
        try_join_all(requests.iter().map(|request| self.run_request(ctx, batch, request))).await
    }

    async fn run_request(
        &self,
        ctx: &RequestContext,
        batch: &[Uuid],
        request: &AggregateRequest,
    ) -> Result<Partial, StatsError> {
        let filter = Filter::new(Assessment::TABLE)?
            .with(Predicate::in_list("user_id", batch.iter().map(|id| id.to_string())))
            .with_all(self.filter.predicates());

        match request {
            AggregateRequest::CountAll => {
                let count = ctx.guard(ctx.store().count(&filter)).await?;
                Ok(Partial::Count(count))
            }
            AggregateRequest::CountByStatus(status) => {
                let filter = filter.with(Predicate::eq("status", status.as_str()));
                let count = ctx.guard(ctx.store().count(&filter)).await?;
                Ok(Partial::Count(count))
            }
            AggregateRequest::Scores { status, source } => {
                let mut filter = filter.select([source.column()])?;
                if let Some(status) = status {
                    filter = filter.with(Predicate::eq("status", status.as_str()));
                }
                let rows = ctx.guard(ctx.store().select(&filter)).await?;
                Ok(Partial::Values(rows.iter().filter_map(|row| source.extract(row)).collect()))
            }
        }
    }

    fn merge(requests: &[AggregateRequest], partials: Vec<Vec<Partial>>) -> AggregateResults {
        let mut counts = vec![0i64; requests.len()];
        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); requests.len()];

        for batch in partials {
            for (index, partial) in batch.into_iter().enumerate() {
                match partial {
                    Partial::Count(n) => counts[index] += n,
                    Partial::Values(values) => samples[index].extend(values),
                }
            }
        }

        let values = requests
            .iter()
            .zip(counts.into_iter().zip(samples))
            .map(|(request, (count, values))| match request {
                AggregateRequest::CountAll | AggregateRequest::CountByStatus(_) => AggregateValue::Count(count),
                AggregateRequest::Scores { .. } => AggregateValue::Scores(ScoreSummary::from_values(values)),
            })
            .collect();
        AggregateResults { values }
    }
}
