use std::collections::HashMap;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::assessment_dto::{
    AssessmentResult, StartAssessmentResponse, SubmittedAnswer, UserAnswerView,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Identity;
use crate::models::question::{Choice, Question};
use crate::models::user_assessment::{AssessmentStatus, UserAssessment};
use crate::services::grading_service::GradingService;
use crate::services::invite_service::{find_assessment, LINKAGE_COLUMNS};
use crate::services::user_service::lock_user;

/// Moves linkages through STARTED and COMPLETED.
#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn start(&self, student_id: Uuid, assessment_id: i64) -> Result<StartAssessmentResponse> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, student_id).await?;
        let assessment = find_assessment(&mut tx, assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;

        let linkages = sqlx::query_as::<_, UserAssessment>(&format!(
            r#"SELECT {}
               FROM user_assessments
               WHERE user_id = $1 AND assessment_id = $2
               ORDER BY id ASC
               FOR UPDATE"#,
            LINKAGE_COLUMNS
        ))
        .bind(student_id)
        .bind(assessment_id)
        .fetch_all(&mut *tx)
        .await?;

        let statuses: Vec<Option<AssessmentStatus>> = linkages.iter().map(|l| l.status()).collect();
        if statuses.contains(&Some(AssessmentStatus::Started)) {
            return Err(Error::BadRequest(
                "You already have an active assessment for this test".to_string(),
            ));
        }

        let now = Utc::now();
        let startable = linkages
            .iter()
            .find(|l| l.status().map(|s| s.can_start()).unwrap_or(false));

        let started = match startable {
            Some(linkage) => {
                sqlx::query_as::<_, UserAssessment>(&format!(
                    r#"UPDATE user_assessments
                       SET status = 'started', start_time = $2, end_time = NULL
                       WHERE id = $1
                       RETURNING {}"#,
                    LINKAGE_COLUMNS
                ))
                .bind(linkage.id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            None if linkages.is_empty() => {
                sqlx::query_as::<_, UserAssessment>(&format!(
                    r#"INSERT INTO user_assessments (user_id, assessment_id, recruiter_id, status, start_time)
                       VALUES ($1, $2, NULL, 'started', $3)
                       RETURNING {}"#,
                    LINKAGE_COLUMNS
                ))
                .bind(student_id)
                .bind(assessment_id)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                return Err(Error::BadRequest("Assessment already completed".to_string()));
            }
        };

        tx.commit().await?;
        tracing::info!(%student_id, assessment_id, user_assessment_id = started.id, "assessment started");
        Ok(StartAssessmentResponse {
            user_assessment_id: started.id,
            assessment_id,
            status: AssessmentStatus::Started,
            start_time: now,
            duration: assessment.duration,
        })
    }

    pub async fn submit(
        &self,
        student_id: Uuid,
        user_assessment_id: i64,
        submitted: &[SubmittedAnswer],
    ) -> Result<AssessmentResult> {
        let mut tx = self.pool.begin().await?;
        let linkage = sqlx::query_as::<_, UserAssessment>(&format!(
            "SELECT {} FROM user_assessments WHERE id = $1 AND user_id = $2 FOR UPDATE",
            LINKAGE_COLUMNS
        ))
        .bind(user_assessment_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("User assessment not found".to_string()))?;

        match linkage.status() {
            Some(AssessmentStatus::Completed) => {
                return Err(Error::BadRequest("Assessment already completed".to_string()))
            }
            Some(AssessmentStatus::Started) => {}
            _ => return Err(Error::BadRequest("Assessment has not been started".to_string())),
        }

        let assessment = find_assessment(&mut tx, linkage.assessment_id)
            .await?
            .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;
        let now = Utc::now();
        let started_at = linkage.start_time.unwrap_or(now);
        if now - started_at > Duration::minutes(i64::from(assessment.duration)) {
            return Err(Error::BadRequest("Assessment time has expired".to_string()));
        }

        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT q.id, q.question_text, q.marks
               FROM assessment_questions aq
               JOIN questions q ON q.id = aq.question_id
               WHERE aq.assessment_id = $1"#,
        )
        .bind(assessment.id)
        .fetch_all(&mut *tx)
        .await?;

        // Descending so the lowest correct choice id wins per question.
        let correct: HashMap<i64, i64> = sqlx::query_as::<_, Choice>(
            r#"SELECT c.id, c.question_id, c.choice_text, c.is_correct
               FROM choices c
               JOIN assessment_questions aq ON aq.question_id = c.question_id
               WHERE aq.assessment_id = $1 AND c.is_correct
               ORDER BY c.id DESC"#,
        )
        .bind(assessment.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|c| (c.question_id, c.id))
        .collect();

        let outcome = GradingService::grade(&questions, &correct, submitted)?;

        for answer in &outcome.answers {
            sqlx::query(
                r#"INSERT INTO user_answers (user_assessment_id, question_id, selected_choice_id, is_correct)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(linkage.id)
            .bind(answer.question_id)
            .bind(answer.selected_choice_id)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"UPDATE user_assessments
               SET score = $2, end_time = $3, status = 'completed'
               WHERE id = $1"#,
        )
        .bind(linkage.id)
        .bind(outcome.score)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            %student_id,
            user_assessment_id,
            score = outcome.score,
            total_marks = outcome.total_marks,
            "assessment submitted"
        );

        Ok(AssessmentResult {
            user_assessment_id,
            score: outcome.score,
            total_questions: questions.len(),
            total_marks: outcome.total_marks,
            percentage: outcome.percentage(),
            completed_at: now,
        })
    }

    /// Stored answers of one linkage, visible to its owner and to recruiters.
    pub async fn answers(
        &self,
        viewer: &Identity,
        user_assessment_id: i64,
    ) -> Result<Vec<UserAnswerView>> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM user_assessments WHERE id = $1")
            .bind(user_assessment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User assessment not found".to_string()))?;
        if owner != viewer.id && !viewer.role.can_recruit() {
            return Err(Error::Forbidden("Access denied".to_string()));
        }

        let answers = sqlx::query_as::<_, UserAnswerView>(
            r#"SELECT id, user_assessment_id, question_id, selected_choice_id, is_correct
               FROM user_answers
               WHERE user_assessment_id = $1
               ORDER BY id ASC"#,
        )
        .bind(user_assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }
}
