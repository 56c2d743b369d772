use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::RecruiterProfile;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecruiterCodeRequest {
    #[validate(length(min = 1, max = 32))]
    pub recruiter_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecruiterCodeValidation {
    pub is_valid: bool,
    pub recruiter_name: Option<String>,
    pub recruiter_id: Option<Uuid>,
    pub message: String,
}

impl From<Option<RecruiterProfile>> for RecruiterCodeValidation {
    fn from(recruiter: Option<RecruiterProfile>) -> Self {
        match recruiter {
            Some(r) => Self {
                is_valid: true,
                recruiter_name: Some(r.name),
                recruiter_id: Some(r.id),
                message: "Valid recruiter code.".to_string(),
            },
            None => Self {
                is_valid: false,
                recruiter_name: None,
                recruiter_id: None,
                message: "Invalid recruiter code. Please check and try again.".to_string(),
            },
        }
    }
}

/// One linkage between a student and a recruiter, projected for display.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkedAssessment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration: i32,
    pub status: String,
    pub score: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkResponse {
    pub message: String,
    pub recruiter_name: String,
    pub recruiter_id: Uuid,
    pub linked_assessment_count: usize,
    pub linked_assessments: Vec<LinkedAssessment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyRecruiterCodeResponse {
    pub recruiter_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyRecruiterResponse {
    pub message: String,
    pub recruiter: Option<RecruiterProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecruiterAssessmentsResponse {
    pub message: String,
    pub assessments: Vec<LinkedAssessment>,
}
