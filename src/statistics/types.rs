use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::Predicate;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    pub total_students: i64,
    pub total_classes: i64,
    pub total_assessments: i64,
    pub completed_assessments: i64,
    pub in_progress_assessments: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLevel {
    College,
    Major,
    Class,
}

/// Completion and score figures for one organizational unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeGroup {
    pub level: GroupLevel,
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub student_count: i64,
    pub total_assessments: i64,
    pub completed_assessments: i64,
    pub completion_rate: f64,
    pub avg_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

/// Restricts which assessments are counted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFilter {
    pub scale_id: Option<Uuid>,
    pub started_from: Option<DateTime<Utc>>,
    pub started_to: Option<DateTime<Utc>>,
}

impl AssessmentFilter {
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![];
        if let Some(scale_id) = self.scale_id {
            predicates.push(Predicate::eq("scale_id", scale_id.to_string()));
        }
        if self.started_from.is_some() || self.started_to.is_some() {
            predicates.push(Predicate::range(
                "started_at",
                self.started_from.map(|t| t.to_rfc3339().into()),
                self.started_to.map(|t| t.to_rfc3339().into()),
            ));
        }
        predicates
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of completed over total, two decimals; 0 when there is nothing to complete
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn completion_rate_rounds_and_handles_zero() {
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(1, 8), 12.5);
        assert_eq!(completion_rate(0, 0), 0.0);
    }

    #[test]
    fn filter_compiles_to_equality_and_range() {
        let scale = Uuid::new_v4();
        let from = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let filter = AssessmentFilter { scale_id: Some(scale), started_from: Some(from), started_to: None };
        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::eq("scale_id", scale.to_string()),
                Predicate::range("started_at", Some(from.to_rfc3339().into()), None),
            ]
        );
        assert!(AssessmentFilter::default().predicates().is_empty());
    }
}
