use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::recruiter_code_dto::{LinkResponse, LinkedAssessment};
use crate::error::{Error, Result};
use crate::middleware::auth::Identity;
use crate::models::user::RecruiterProfile;
use crate::services::user_service::{lock_user, set_linked_recruiter_once, UserService};
use crate::utils::token::{is_well_formed_recruiter_code, normalize_recruiter_code};

/// Student-to-recruiter linking driven by a recruiter code.
#[derive(Clone)]
pub struct LinkingService {
    pool: PgPool,
    users: UserService,
}

impl LinkingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            pool,
        }
    }

    /// Resolves a code to its recruiter. Codes held by other roles never match.
    pub async fn validate_code(&self, raw_code: &str) -> Result<Option<RecruiterProfile>> {
        let code = normalize_recruiter_code(raw_code);
        if !is_well_formed_recruiter_code(&code) {
            return Ok(None);
        }
        let recruiter = sqlx::query_as::<_, RecruiterProfile>(
            r#"SELECT id, name, email
               FROM users
               WHERE recruiter_code = $1 AND LOWER(role) IN ('admin', 'recruiter')"#,
        )
        .bind(&code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recruiter)
    }

    pub async fn link(&self, student: &Identity, raw_code: &str) -> Result<LinkResponse> {
        if !student.role.can_take_assessments() {
            return Err(Error::Forbidden(
                "Only students can link to recruiters".to_string(),
            ));
        }
        let recruiter = self
            .validate_code(raw_code)
            .await?
            .ok_or(Error::InvalidRecruiterCode)?;

        let mut tx = self.pool.begin().await?;
        // Serialises concurrent link attempts by the same student.
        let student_row = lock_user(&mut tx, student.id).await?;

        let has_linkage = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_assessments WHERE user_id = $1 AND recruiter_id = $2)",
        )
        .bind(student.id)
        .bind(recruiter.id)
        .fetch_one(&mut *tx)
        .await?;
        if has_linkage || student_row.linked_recruiter_id == Some(recruiter.id) {
            return Err(Error::AlreadyLinked);
        }

        let created = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO user_assessments (user_id, assessment_id, recruiter_id, status)
               SELECT $1, a.id, $2, 'invited'
               FROM assessments a
               WHERE a.created_by_user_id = $2
               ORDER BY a.id
               ON CONFLICT (user_id, assessment_id, (COALESCE(recruiter_id, '00000000-0000-0000-0000-000000000000'::uuid)))
               DO NOTHING
               RETURNING id"#,
        )
        .bind(student.id)
        .bind(recruiter.id)
        .fetch_all(&mut *tx)
        .await?;

        if !set_linked_recruiter_once(&mut tx, student.id, recruiter.id).await? {
            tracing::info!(
                student_id = %student.id,
                recruiter_id = %recruiter.id,
                "student already has a primary recruiter, keeping it"
            );
        }

        tx.commit().await?;
        tracing::info!(
            student_id = %student.id,
            recruiter_id = %recruiter.id,
            created = created.len(),
            "student linked to recruiter"
        );

        let linked_assessments = self.assessments_for(student.id, recruiter.id).await?;
        Ok(LinkResponse {
            message: format!("Successfully linked to {}", recruiter.name),
            recruiter_name: recruiter.name,
            recruiter_id: recruiter.id,
            linked_assessment_count: created.len(),
            linked_assessments,
        })
    }

    /// Linkages between the pair, in insertion order.
    pub async fn assessments_for(
        &self,
        student_id: Uuid,
        recruiter_id: Uuid,
    ) -> Result<Vec<LinkedAssessment>> {
        let rows = sqlx::query_as::<_, LinkedAssessment>(
            r#"SELECT a.id, a.name, a.description, a.duration,
                      UPPER(ua.status) AS status, ua.score, ua.start_time, ua.end_time
               FROM user_assessments ua
               JOIN assessments a ON a.id = ua.assessment_id
               WHERE ua.user_id = $1 AND ua.recruiter_id = $2
               ORDER BY ua.id ASC"#,
        )
        .bind(student_id)
        .bind(recruiter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The recruiter recorded at the student's first link.
    pub async fn my_recruiter(&self, student_id: Uuid) -> Result<Option<RecruiterProfile>> {
        let student = self.users.require(student_id).await?;
        let Some(recruiter_id) = student.linked_recruiter_id else {
            return Ok(None);
        };
        let recruiter = sqlx::query_as::<_, RecruiterProfile>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(recruiter_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recruiter)
    }

    pub async fn linked_recruiter_assessments(
        &self,
        student_id: Uuid,
    ) -> Result<Option<Vec<LinkedAssessment>>> {
        let student = self.users.require(student_id).await?;
        match student.linked_recruiter_id {
            Some(recruiter_id) => Ok(Some(self.assessments_for(student_id, recruiter_id).await?)),
            None => Ok(None),
        }
    }
}
