use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::dto::invite_dto::{
    InvitePreview, InviteStatusKind, InviteStatusResponse, RedeemResponse, SendInvitesRequest,
    SendInvitesResponse,
};
use crate::error::Result;
use crate::middleware::auth::Identity;
use crate::AppState;

#[axum::debug_handler]
pub async fn send_invites(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendInvitesRequest>,
) -> Result<Json<SendInvitesResponse>> {
    req.validate()?;
    let summary = state
        .invite_service
        .issue_invitations(identity.id, req.assessment_id, &req.emails)
        .await?;
    Ok(Json(summary))
}

#[axum::debug_handler]
pub async fn validate_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitePreview>> {
    let preview = state.invite_service.validate(&token).await?;
    Ok(Json(preview))
}

#[axum::debug_handler]
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(token): Path<String>,
) -> Result<Json<RedeemResponse>> {
    let outcome = state.invite_service.redeem(&token, &identity).await?;
    Ok(Json(outcome))
}

/// Always 200; the payload carries the classification.
#[axum::debug_handler]
pub async fn invite_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<InviteStatusResponse> {
    match state.invite_service.status(&token).await {
        Ok(status) => Json(status),
        Err(e) => {
            tracing::error!(error = %e, "invite status lookup failed");
            Json(InviteStatusResponse::invalid(InviteStatusKind::Unavailable))
        }
    }
}
