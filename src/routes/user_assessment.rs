use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::assessment_dto::{
    AssessmentResult, AssessmentStatistics, MyAssessment, RecruiterSummaryStats, StartAssessmentRequest,
    StartAssessmentResponse, StudentSummary, SubmitAssessmentRequest, UserAnswerView,
};
use crate::error::Result;
use crate::middleware::auth::Identity;
use crate::AppState;

#[axum::debug_handler]
pub async fn my_assessments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<MyAssessment>>> {
    let items = state.assignment_service.my_assessments(identity.id).await?;
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn recruiter_stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<RecruiterSummaryStats>> {
    let stats = state
        .assignment_service
        .recruiter_summary_stats(identity.id)
        .await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn recruiter_students(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<StudentSummary>>> {
    let students = state.assignment_service.recruiter_students(identity.id).await?;
    Ok(Json(students))
}

#[axum::debug_handler]
pub async fn start_assessment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<StartAssessmentRequest>,
) -> Result<Json<StartAssessmentResponse>> {
    req.validate()?;
    let started = state
        .attempt_service
        .start(identity.id, req.assessment_id)
        .await?;
    Ok(Json(started))
}

#[axum::debug_handler]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_assessment_id): Path<i64>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<Json<AssessmentResult>> {
    req.validate()?;
    let result = state
        .attempt_service
        .submit(identity.id, user_assessment_id, &req.answers)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn assessment_answers(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(user_assessment_id): Path<i64>,
) -> Result<Json<Vec<UserAnswerView>>> {
    let answers = state
        .attempt_service
        .answers(&identity, user_assessment_id)
        .await?;
    Ok(Json(answers))
}

#[axum::debug_handler]
pub async fn statistics(State(state): State<AppState>) -> Result<Json<AssessmentStatistics>> {
    let stats = state.assignment_service.statistics().await?;
    Ok(Json(stats))
}
