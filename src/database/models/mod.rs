pub mod assessment;
pub mod grant;
pub mod org;
pub mod student;

pub use assessment::{Assessment, AssessmentStatus, RawScores, SCORE_FIELDS};
pub use grant::{GrantLevel, PermissionGrant};
pub use org::{Class, College, Major};
pub use student::StudentProfile;

/// Binds a model to the table its rows live in
pub trait Table {
    const TABLE: &'static str;
}
