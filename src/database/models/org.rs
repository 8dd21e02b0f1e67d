use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Major {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub college_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub major_id: Uuid,
    pub enrollment_year: i32,
    /// Position within the major's cohort; unnumbered classes sort last
    #[serde(default)]
    pub class_number: Option<i32>,
}

impl Table for College {
    const TABLE: &'static str = "colleges";
}

impl Table for Major {
    const TABLE: &'static str = "majors";
}

impl Table for Class {
    const TABLE: &'static str = "classes";
}
