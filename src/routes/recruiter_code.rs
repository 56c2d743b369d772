use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::dto::recruiter_code_dto::{
    LinkResponse, MyRecruiterCodeResponse, MyRecruiterResponse, RecruiterAssessmentsResponse,
    RecruiterCodeRequest, RecruiterCodeValidation,
};
use crate::error::Result;
use crate::middleware::auth::Identity;
use crate::AppState;

#[axum::debug_handler]
pub async fn validate_code(
    State(state): State<AppState>,
    Json(req): Json<RecruiterCodeRequest>,
) -> Result<Json<RecruiterCodeValidation>> {
    let recruiter = state.linking_service.validate_code(&req.recruiter_code).await?;
    Ok(Json(recruiter.into()))
}

#[axum::debug_handler]
pub async fn link(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RecruiterCodeRequest>,
) -> Result<Json<LinkResponse>> {
    req.validate()?;
    let linked = state
        .linking_service
        .link(&identity, &req.recruiter_code)
        .await?;
    Ok(Json(linked))
}

#[axum::debug_handler]
pub async fn my_code(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MyRecruiterCodeResponse>> {
    let recruiter_code = state.code_service.ensure_recruiter_code(identity.id).await?;
    Ok(Json(MyRecruiterCodeResponse { recruiter_code }))
}

#[axum::debug_handler]
pub async fn my_recruiter(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MyRecruiterResponse>> {
    let recruiter = state.linking_service.my_recruiter(identity.id).await?;
    let message = if recruiter.is_some() {
        "Recruiter found"
    } else {
        "No recruiter linked"
    };
    Ok(Json(MyRecruiterResponse {
        message: message.to_string(),
        recruiter,
    }))
}

#[axum::debug_handler]
pub async fn recruiter_assessments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<RecruiterAssessmentsResponse>> {
    let response = match state
        .linking_service
        .linked_recruiter_assessments(identity.id)
        .await?
    {
        Some(assessments) => RecruiterAssessmentsResponse {
            message: "Assessments retrieved successfully".to_string(),
            assessments,
        },
        None => RecruiterAssessmentsResponse {
            message: "No recruiter linked".to_string(),
            assessments: Vec::new(),
        },
    };
    Ok(Json(response))
}
