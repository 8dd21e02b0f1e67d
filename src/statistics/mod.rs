pub mod aggregator;
pub mod service;
pub mod types;

pub use aggregator::{AggregateRequest, AggregateResults, AggregateValue, BatchedAggregator, ScoreSource, ScoreSummary};
pub use service::StatisticsService;
pub use types::{AssessmentFilter, GradeGroup, GroupLevel, Overview};
