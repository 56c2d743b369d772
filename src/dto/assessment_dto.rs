use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user_assessment::AssessmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyAssessment {
    pub assessment_id: i64,
    pub assessment_name: String,
    pub status: AssessmentStatus,
    pub score_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterSummaryStats {
    pub total_assigned: usize,
    pub attempted: usize,
    pub not_attempted: usize,
    pub completed: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAssessmentEntry {
    pub assessment_id: i64,
    pub assessment_name: String,
    pub status: AssessmentStatus,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub assessments: Vec<StudentAssessmentEntry>,
    pub total_assigned: usize,
    pub total_completed: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartAssessmentRequest {
    #[validate(range(min = 1))]
    pub assessment_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAssessmentResponse {
    pub user_assessment_id: i64,
    pub assessment_id: i64,
    pub status: AssessmentStatus,
    pub start_time: DateTime<Utc>,
    pub duration: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAssessmentRequest {
    #[validate(length(max = 500))]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub user_assessment_id: i64,
    pub score: i32,
    pub total_questions: usize,
    pub total_marks: i64,
    pub percentage: f64,
    pub completed_at: DateTime<Utc>,
}

/// A stored answer, as recorded at submission.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAnswerView {
    pub id: i64,
    pub user_assessment_id: i64,
    pub question_id: i64,
    pub selected_choice_id: Option<i64>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentStatistics {
    pub total_assessments_taken: i64,
    pub completed_assessments: i64,
    pub average_score: f64,
    pub completion_rate: f64,
}
