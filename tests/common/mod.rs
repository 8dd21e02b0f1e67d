#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use campus_scope::auth::{AuthContext, Role};
use campus_scope::database::models::{
    Assessment, AssessmentStatus, Class, College, GrantLevel, Major, PermissionGrant, RawScores, StudentProfile, Table,
};
use campus_scope::database::MemoryStore;
use campus_scope::RequestContext;

/// A campus seeded into an in-process store
pub struct Campus {
    pub store: Arc<MemoryStore>,
}

impl Campus {
    pub fn new() -> Self {
        Self { store: Arc::new(MemoryStore::new()) }
    }

    /// Caller context for a teacher
    pub fn ctx(&self) -> RequestContext {
        self.ctx_as(Role::Teacher)
    }

    pub fn ctx_as(&self, role: Role) -> RequestContext {
        RequestContext::new(AuthContext::new(Uuid::new_v4(), role), self.store.clone())
    }

    pub async fn college(&self, name: &str, code: &str) -> Result<College> {
        let college = College { id: Uuid::new_v4(), name: name.into(), code: code.into() };
        self.store.insert(College::TABLE, &college).await?;
        Ok(college)
    }

    pub async fn major(&self, name: &str, code: &str, college_id: Uuid) -> Result<Major> {
        let major = Major { id: Uuid::new_v4(), name: name.into(), code: code.into(), college_id };
        self.store.insert(Major::TABLE, &major).await?;
        Ok(major)
    }

    pub async fn class(&self, name: &str, major_id: Uuid, class_number: Option<i32>) -> Result<Class> {
        let class = Class { id: Uuid::new_v4(), name: name.into(), major_id, enrollment_year: 2023, class_number };
        self.store.insert(Class::TABLE, &class).await?;
        Ok(class)
    }

    pub async fn student(&self, name: &str, class: &Class, major: &Major) -> Result<StudentProfile> {
        let student = StudentProfile {
            id: Uuid::new_v4(),
            role: Role::Student,
            name: Some(name.into()),
            student_number: None,
            college_id: Some(major.college_id),
            major_id: Some(major.id),
            class_id: Some(class.id),
        };
        self.store.insert(StudentProfile::TABLE, &student).await?;
        Ok(student)
    }

    /// `count` students named "<prefix> <n>"
    pub async fn students(&self, prefix: &str, count: usize, class: &Class, major: &Major) -> Result<Vec<StudentProfile>> {
        let mut students = Vec::with_capacity(count);
        for n in 0..count {
            students.push(self.student(&format!("{prefix} {n:03}"), class, major).await?);
        }
        Ok(students)
    }

    pub async fn assessment(&self, user_id: Uuid, status: AssessmentStatus, total_score: Option<f64>) -> Result<Assessment> {
        self.assessment_at(user_id, status, RawScores { total_score, final_score: None }, Utc::now(), None)
            .await
    }

    pub async fn assessment_at(
        &self,
        user_id: Uuid,
        status: AssessmentStatus,
        raw_scores: RawScores,
        started_at: DateTime<Utc>,
        scale_id: Option<Uuid>,
    ) -> Result<Assessment> {
        let assessment = Assessment {
            id: Uuid::new_v4(),
            user_id,
            scale_id: scale_id.unwrap_or_else(Uuid::new_v4),
            status,
            raw_scores,
            started_at,
            completed_at: None,
        };
        self.store.insert(Assessment::TABLE, &assessment).await?;
        Ok(assessment)
    }

    pub async fn grant(&self, teacher_id: Uuid, level: GrantLevel, target: Option<Uuid>) -> Result<PermissionGrant> {
        let mut grant = PermissionGrant {
            id: Uuid::new_v4(),
            teacher_id,
            level,
            college_id: None,
            major_id: None,
            class_id: None,
            academic_year: "2024-2025".into(),
        };
        match level {
            GrantLevel::School => {}
            GrantLevel::College => grant.college_id = target,
            GrantLevel::Major => grant.major_id = target,
            GrantLevel::Class => grant.class_id = target,
        }
        self.store.insert(PermissionGrant::TABLE, &grant).await?;
        Ok(grant)
    }
}

/// The reference campus: college c1 "01", major m1 "01", class k1 with three
/// students, two completed assessments (10, 20) and one in progress.
pub struct Reference {
    pub campus: Campus,
    pub college: College,
    pub major: Major,
    pub class: Class,
    pub students: Vec<StudentProfile>,
}

pub async fn reference_campus() -> Result<Reference> {
    let campus = Campus::new();
    let college = campus.college("Engineering", "01").await?;
    let major = campus.major("Software", "01", college.id).await?;
    let class = campus.class("Software 2023-1", major.id, Some(1)).await?;
    let students = campus.students("Student", 3, &class, &major).await?;

    campus.assessment(students[0].id, AssessmentStatus::Completed, Some(10.0)).await?;
    campus.assessment(students[1].id, AssessmentStatus::Completed, Some(20.0)).await?;
    campus.assessment(students[2].id, AssessmentStatus::InProgress, None).await?;

    Ok(Reference { campus, college, major, class, students })
}
