use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::dto::invite_dto::{
    FailedInvite, InvitePreview, InviteStatusKind, InviteStatusResponse, QuestionPreview,
    RedeemKind, RedeemResponse, SendInvitesResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Identity;
use crate::models::assessment::Assessment;
use crate::models::invite_token::{InviteToken, TokenState};
use crate::models::user::User;
use crate::models::user_assessment::UserAssessment;
use crate::services::code_service::CodeService;
use crate::services::notification_service::{
    dispatch_invite, invitation_link, render_invite_email, InviteNotifier,
};
use crate::services::user_service::{lock_user, set_linked_recruiter_once, UserService};
use crate::utils::token::generate_invitation_token;

pub(crate) const LINKAGE_COLUMNS: &str =
    "id, user_id, assessment_id, recruiter_id, status, score, start_time, end_time, created_at";

const TOKEN_COLUMNS: &str = "id, token, assessment_id, recipient_email, used, expires_at, created_at";

const ASSESSMENT_COLUMNS: &str = "id, name, description, duration, created_by_user_id, created_at";

/// Single-use, time-bounded invitation tokens.
#[derive(Clone)]
pub struct InviteService {
    pool: PgPool,
    users: UserService,
    codes: CodeService,
    notifier: Arc<dyn InviteNotifier>,
    frontend_url: String,
    mail_from_name: String,
    ttl: Duration,
}

impl InviteService {
    pub fn new(
        pool: PgPool,
        notifier: Arc<dyn InviteNotifier>,
        frontend_url: String,
        mail_from_name: String,
        ttl: Duration,
    ) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            codes: CodeService::new(pool.clone()),
            pool,
            notifier,
            frontend_url,
            mail_from_name,
            ttl,
        }
    }

    /// Persists one token. Delivery is the caller's concern.
    pub async fn issue(&self, assessment_id: i64, recipient_email: &str) -> Result<InviteToken> {
        let token = generate_invitation_token();
        let created_at = Utc::now();
        let expires_at = created_at + self.ttl;
        let invite = sqlx::query_as::<_, InviteToken>(&format!(
            r#"INSERT INTO invite_tokens (token, assessment_id, recipient_email, used, expires_at, created_at)
               VALUES ($1, $2, $3, FALSE, $4, $5)
               RETURNING {}"#,
            TOKEN_COLUMNS
        ))
        .bind(&token)
        .bind(assessment_id)
        .bind(recipient_email)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(invite_id = invite.id, assessment_id, "invitation issued");
        Ok(invite)
    }

    /// Issues one token per recipient; a failing recipient never aborts the batch.
    pub async fn issue_invitations(
        &self,
        recruiter_id: Uuid,
        assessment_id: i64,
        emails: &[String],
    ) -> Result<SendInvitesResponse> {
        let recruiter = self.users.require(recruiter_id).await?;
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM assessments WHERE id = $1 AND created_by_user_id = $2)",
        )
        .bind(assessment_id)
        .bind(recruiter_id)
        .fetch_one(&self.pool)
        .await?;
        if !owned {
            return Err(Error::NotFound(
                "Assessment not found or you don't have permission to invite students to it"
                    .to_string(),
            ));
        }
        let code = self.codes.ensure_recruiter_code(recruiter_id).await?;

        let mut successful = 0usize;
        let mut failed = Vec::new();
        for raw in emails {
            let email = raw.trim();
            match self.issue_one(&recruiter, &code, assessment_id, email).await {
                Ok(()) => successful += 1,
                Err(e) => {
                    tracing::warn!(recipient = %email, error = %e, "invitation not issued");
                    failed.push(FailedInvite {
                        email: email.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            %recruiter_id,
            assessment_id,
            successful,
            failed = failed.len(),
            "invitation batch processed"
        );
        Ok(SendInvitesResponse::from_results(successful, failed))
    }

    async fn issue_one(
        &self,
        recruiter: &User,
        code: &str,
        assessment_id: i64,
        email: &str,
    ) -> Result<()> {
        if !email.validate_email() {
            return Err(Error::BadRequest("Invalid email address".to_string()));
        }
        let invite = self.issue(assessment_id, email).await?;
        let link = invitation_link(&self.frontend_url, &invite.token, code)?;
        let message = render_invite_email(
            email,
            &recruiter.name,
            &recruiter.email,
            &self.mail_from_name,
            &link,
        );
        dispatch_invite(self.notifier.clone(), message);
        Ok(())
    }

    /// Read-only preview of the invited assessment.
    pub async fn validate(&self, token: &str) -> Result<InvitePreview> {
        let invite = self
            .find_token(token)
            .await?
            .ok_or(Error::InviteNotFound)?;
        match invite.state_at(Utc::now()) {
            TokenState::Used => return Err(Error::InviteAlreadyUsed),
            TokenState::Expired => return Err(Error::InviteExpired),
            TokenState::Redeemable => {}
        }

        let mut conn = self.pool.acquire().await?;
        let assessment = find_assessment(&mut conn, invite.assessment_id)
            .await?
            .ok_or(Error::AssessmentMissing)?;
        let questions = sqlx::query_as::<_, QuestionPreview>(
            r#"SELECT q.id, q.question_text AS text
               FROM assessment_questions aq
               JOIN questions q ON q.id = aq.question_id
               WHERE aq.assessment_id = $1
               ORDER BY q.id"#,
        )
        .bind(assessment.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(InvitePreview {
            assessment_id: assessment.id,
            title: assessment.name,
            duration: assessment.duration,
            questions,
        })
    }

    /// Consumes the token and materialises the linkage in one transaction.
    pub async fn redeem(&self, token: &str, redeemer: &Identity) -> Result<RedeemResponse> {
        let mut tx = self.pool.begin().await?;

        // Concurrent redemptions of the same token queue up on this lock.
        let invite = sqlx::query_as::<_, InviteToken>(&format!(
            "SELECT {} FROM invite_tokens WHERE token = $1 FOR UPDATE",
            TOKEN_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::InviteNotFound)?;

        lock_user(&mut tx, redeemer.id).await?;
        let assessment = find_assessment(&mut tx, invite.assessment_id).await?;

        match invite.state_at(Utc::now()) {
            TokenState::Used => {
                let Some(assessment) = assessment else {
                    return Err(Error::InviteAlreadyUsed);
                };
                let existing = find_linkage(
                    &mut tx,
                    redeemer.id,
                    assessment.id,
                    Some(assessment.created_by_user_id),
                )
                .await?;
                return match existing {
                    Some(linkage) => {
                        tracing::debug!(invite_id = invite.id, user_id = %redeemer.id, "used invitation re-redeemed by its holder");
                        Ok(RedeemResponse::new(RedeemKind::AlreadyLinked, &linkage, assessment.name))
                    }
                    None => Err(Error::InviteAlreadyUsed),
                };
            }
            TokenState::Expired => return Err(Error::InviteExpired),
            TokenState::Redeemable => {}
        }

        let assessment = assessment.ok_or(Error::AssessmentMissing)?;
        let recruiter_id = assessment.created_by_user_id;

        let inserted = sqlx::query_as::<_, UserAssessment>(&format!(
            r#"INSERT INTO user_assessments (user_id, assessment_id, recruiter_id, status)
               VALUES ($1, $2, $3, 'invited')
               ON CONFLICT (user_id, assessment_id, (COALESCE(recruiter_id, '00000000-0000-0000-0000-000000000000'::uuid)))
               DO NOTHING
               RETURNING {}"#,
            LINKAGE_COLUMNS
        ))
        .bind(redeemer.id)
        .bind(assessment.id)
        .bind(recruiter_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (kind, linkage) = match inserted {
            Some(linkage) => (RedeemKind::Linked, linkage),
            None => {
                let existing = find_linkage(&mut tx, redeemer.id, assessment.id, Some(recruiter_id))
                    .await?
                    .ok_or_else(|| Error::Internal("Linkage conflict without a row".to_string()))?;
                (RedeemKind::AlreadyLinked, existing)
            }
        };

        sqlx::query("UPDATE invite_tokens SET used = TRUE WHERE id = $1")
            .bind(invite.id)
            .execute(&mut *tx)
            .await?;
        set_linked_recruiter_once(&mut tx, redeemer.id, recruiter_id).await?;

        tx.commit().await?;
        tracing::info!(
            invite_id = invite.id,
            user_id = %redeemer.id,
            assessment_id = assessment.id,
            outcome = ?kind,
            "invitation redeemed"
        );
        Ok(RedeemResponse::new(kind, &linkage, assessment.name))
    }

    /// Classification for UI polling; never mutates.
    pub async fn status(&self, token: &str) -> Result<InviteStatusResponse> {
        let Some(invite) = self.find_token(token).await? else {
            return Ok(InviteStatusResponse::invalid(InviteStatusKind::NotFound));
        };
        match invite.state_at(Utc::now()) {
            TokenState::Used => return Ok(InviteStatusResponse::invalid(InviteStatusKind::Used)),
            TokenState::Expired => {
                return Ok(InviteStatusResponse::invalid(InviteStatusKind::Expired))
            }
            TokenState::Redeemable => {}
        }

        let mut conn = self.pool.acquire().await?;
        let Some(assessment) = find_assessment(&mut conn, invite.assessment_id).await? else {
            return Ok(InviteStatusResponse::invalid(
                InviteStatusKind::AssessmentNotFound,
            ));
        };
        Ok(InviteStatusResponse {
            valid: true,
            status: InviteStatusKind::Valid,
            message: "Invitation is valid".to_string(),
            assessment_name: Some(assessment.name),
            recipient_email: Some(invite.recipient_email),
            expires_at: Some(invite.expires_at),
        })
    }

    pub async fn find_token(&self, token: &str) -> Result<Option<InviteToken>> {
        let invite = sqlx::query_as::<_, InviteToken>(&format!(
            "SELECT {} FROM invite_tokens WHERE token = $1",
            TOKEN_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invite)
    }
}

pub(crate) async fn find_assessment(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Assessment>> {
    let assessment = sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {} FROM assessments WHERE id = $1",
        ASSESSMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(assessment)
}

pub(crate) async fn find_linkage(
    conn: &mut PgConnection,
    user_id: Uuid,
    assessment_id: i64,
    recruiter_id: Option<Uuid>,
) -> Result<Option<UserAssessment>> {
    let linkage = sqlx::query_as::<_, UserAssessment>(&format!(
        r#"SELECT {}
           FROM user_assessments
           WHERE user_id = $1 AND assessment_id = $2 AND recruiter_id IS NOT DISTINCT FROM $3"#,
        LINKAGE_COLUMNS
    ))
    .bind(user_id)
    .bind(assessment_id)
    .bind(recruiter_id)
    .fetch_optional(conn)
    .await?;
    Ok(linkage)
}
