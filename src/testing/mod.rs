use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::context::RequestContext;
use crate::database::models::{
    Assessment, AssessmentStatus, Class, College, GrantLevel, Major, PermissionGrant, RawScores, StudentProfile,
};
use crate::database::MemoryStore;

pub fn college(name: &str, code: &str) -> College {
    College { id: Uuid::new_v4(), name: name.into(), code: code.into() }
}

pub fn major(name: &str, code: &str, college_id: Uuid) -> Major {
    Major { id: Uuid::new_v4(), name: name.into(), code: code.into(), college_id }
}

pub fn class(name: &str, major_id: Uuid, class_number: Option<i32>) -> Class {
    Class { id: Uuid::new_v4(), name: name.into(), major_id, enrollment_year: 2023, class_number }
}

/// A grant whose target id lands in the column matching `level`
pub fn grant(teacher_id: Uuid, level: GrantLevel, target: Option<Uuid>) -> PermissionGrant {
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
    grant
}

pub fn student(name: &str, college: &College, major: &Major, class: &Class) -> StudentProfile {
    StudentProfile {
        id: Uuid::new_v4(),
        role: Role::Student,
        name: Some(name.into()),
        student_number: None,
        college_id: Some(college.id),
        major_id: Some(major.id),
        class_id: Some(class.id),
    }
}

pub fn assessment(user_id: Uuid, status: AssessmentStatus, total_score: Option<f64>) -> Assessment {
    Assessment {
        id: Uuid::new_v4(),
        user_id,
        scale_id: Uuid::new_v4(),
        status,
        raw_scores: RawScores { total_score, final_score: None },
        started_at: Utc::now(),
        completed_at: None,
    }
}

pub fn ctx(store: &Arc<MemoryStore>, role: Role) -> RequestContext {
    RequestContext::new(AuthContext::new(Uuid::new_v4(), role), store.clone())
}
