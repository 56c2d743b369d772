use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user_assessment::UserAssessment;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendInvitesRequest {
    #[validate(range(min = 1))]
    pub assessment_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedInvite {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendInvitesResponse {
    pub message: String,
    pub successful_count: usize,
    pub failed_count: usize,
    pub failed_invites: Vec<FailedInvite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SendInvitesResponse {
    pub fn from_results(successful_count: usize, failed_invites: Vec<FailedInvite>) -> Self {
        let failed_count = failed_invites.len();
        let warning = (failed_count > 0).then(|| {
            "Some invitations failed to send. Check the failed_invites list for details."
                .to_string()
        });
        Self {
            message: format!(
                "Invitations processed: {} successful, {} failed",
                successful_count, failed_count
            ),
            successful_count,
            failed_count,
            failed_invites,
            warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionPreview {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitePreview {
    pub assessment_id: i64,
    pub title: String,
    pub duration: i32,
    pub questions: Vec<QuestionPreview>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemKind {
    Linked,
    AlreadyLinked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub outcome: RedeemKind,
    pub message: String,
    pub linkage_id: i64,
    pub assessment_id: i64,
    pub assessment_name: String,
    pub recruiter_id: Option<Uuid>,
    pub status: String,
}

impl RedeemResponse {
    pub fn new(outcome: RedeemKind, linkage: &UserAssessment, assessment_name: String) -> Self {
        let message = match outcome {
            RedeemKind::Linked => "Invitation accepted successfully! Assessment assigned.",
            RedeemKind::AlreadyLinked => "You are already linked to this assessment.",
        };
        Self {
            outcome,
            message: message.to_string(),
            linkage_id: linkage.id,
            assessment_id: linkage.assessment_id,
            assessment_name,
            recruiter_id: linkage.recruiter_id,
            status: linkage.status.to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatusKind {
    Valid,
    Used,
    Expired,
    NotFound,
    AssessmentNotFound,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteStatusResponse {
    pub valid: bool,
    pub status: InviteStatusKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InviteStatusResponse {
    pub fn invalid(status: InviteStatusKind) -> Self {
        let message = match status {
            InviteStatusKind::Valid => "Invitation is valid",
            InviteStatusKind::Used => "This invitation has already been used",
            InviteStatusKind::Expired => "This invitation has expired",
            InviteStatusKind::NotFound => "Invalid invitation token",
            InviteStatusKind::AssessmentNotFound => "Assessment not found for this invitation",
            InviteStatusKind::Unavailable => "Invitation status is temporarily unavailable",
        };
        Self {
            valid: false,
            status,
            message: message.to_string(),
            assessment_name: None,
            recipient_email: None,
            expires_at: None,
        }
    }
}
