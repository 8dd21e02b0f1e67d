use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantLevel {
    School,
    College,
    Major,
    Class,
}

impl GrantLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantLevel::School => "school",
            GrantLevel::College => "college",
            GrantLevel::Major => "major",
            GrantLevel::Class => "class",
        }
    }
}

/// One row of `teacher_permissions`: a teacher authorized at exactly one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub level: GrantLevel,
    #[serde(default)]
    pub college_id: Option<Uuid>,
    #[serde(default)]
    pub major_id: Option<Uuid>,
    #[serde(default)]
    pub class_id: Option<Uuid>,
    pub academic_year: String,
}

impl PermissionGrant {
    /// The id this grant authorizes; `None` for school grants and for malformed rows
    pub fn target_id(&self) -> Option<Uuid> {
        match self.level {
            GrantLevel::School => None,
            GrantLevel::College => self.college_id,
            GrantLevel::Major => self.major_id,
            GrantLevel::Class => self.class_id,
        }
    }
}

impl Table for PermissionGrant {
    const TABLE: &'static str = "teacher_permissions";
}
