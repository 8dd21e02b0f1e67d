use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Table;
use crate::auth::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: Uuid,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub student_number: Option<String>,
    #[serde(default)]
    pub college_id: Option<Uuid>,
    #[serde(default)]
    pub major_id: Option<Uuid>,
    #[serde(default)]
    pub class_id: Option<Uuid>,
}

impl Table for StudentProfile {
    const TABLE: &'static str = "profiles";
}
