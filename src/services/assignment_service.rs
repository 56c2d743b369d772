use std::collections::{HashMap, HashSet};

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::assessment_dto::{
    AssessmentStatistics, MyAssessment, RecruiterSummaryStats, StudentAssessmentEntry,
    StudentSummary,
};
use crate::error::Result;
use crate::models::user_assessment::AssessmentStatus;

pub const PASS_THRESHOLD_PERCENT: f64 = 50.0;

/// A linkage joined with its assessment name and the assessment's total marks.
#[derive(Debug, Clone, FromRow)]
pub struct LinkageScoreRow {
    pub id: i64,
    pub user_id: Uuid,
    pub assessment_id: i64,
    pub assessment_name: Option<String>,
    pub status: String,
    pub score: Option<i32>,
    pub total_marks: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentLinkageRow {
    pub id: i64,
    pub user_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub assessment_id: i64,
    pub assessment_name: Option<String>,
    pub status: String,
    pub score: Option<i32>,
}

/// `None` when unscored or when the assessment carries no marks.
pub fn score_percentage(score: Option<i32>, total_marks: i64) -> Option<f64> {
    match score {
        Some(s) if total_marks > 0 => Some(f64::from(s) / total_marks as f64 * 100.0),
        _ => None,
    }
}

/// One entry per assessment; the lowest linkage id wins.
pub fn merge_assessments(rows: &[LinkageScoreRow]) -> Vec<MyAssessment> {
    let mut ordered: Vec<&LinkageScoreRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(ordered.len());
    for row in ordered {
        if !seen.insert(row.assessment_id) {
            continue;
        }
        let Ok(status) = row.status.parse::<AssessmentStatus>() else {
            tracing::warn!(linkage_id = row.id, status = %row.status, "skipping linkage with unknown status");
            continue;
        };
        merged.push(MyAssessment {
            assessment_id: row.assessment_id,
            assessment_name: row
                .assessment_name
                .clone()
                .unwrap_or_else(|| "Assessment".to_string()),
            status,
            score_percentage: score_percentage(row.score, row.total_marks),
        });
    }
    merged
}

pub fn summarize(rows: &[LinkageScoreRow]) -> RecruiterSummaryStats {
    let mut stats = RecruiterSummaryStats {
        total_assigned: rows.len(),
        ..Default::default()
    };
    for row in rows {
        let Ok(status) = row.status.parse::<AssessmentStatus>() else {
            continue;
        };
        if status.is_attempted() {
            stats.attempted += 1;
        }
        if status != AssessmentStatus::Completed {
            continue;
        }
        stats.completed += 1;
        match score_percentage(row.score, row.total_marks) {
            Some(p) if p >= PASS_THRESHOLD_PERCENT => stats.passed += 1,
            Some(_) => stats.failed += 1,
            None => {}
        }
    }
    stats.not_attempted = stats.total_assigned - stats.attempted;
    stats
}

/// Per-student rollup in order of each student's first linkage.
pub fn rollup_students(rows: &[StudentLinkageRow]) -> Vec<StudentSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_student: HashMap<Uuid, StudentSummary> = HashMap::new();

    let mut ordered: Vec<&StudentLinkageRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.id);
    for row in ordered {
        let Ok(status) = row.status.parse::<AssessmentStatus>() else {
            continue;
        };
        let entry = by_student.entry(row.user_id).or_insert_with(|| {
            order.push(row.user_id);
            StudentSummary {
                student_id: row.user_id,
                student_name: row.student_name.clone(),
                student_email: row.student_email.clone(),
                assessments: Vec::new(),
                total_assigned: 0,
                total_completed: 0,
                average_score: 0.0,
            }
        });
        entry.assessments.push(StudentAssessmentEntry {
            assessment_id: row.assessment_id,
            assessment_name: row
                .assessment_name
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            status,
            score: row.score,
        });
        entry.total_assigned += 1;
        if status == AssessmentStatus::Completed && row.score.is_some() {
            entry.total_completed += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_student.remove(&id))
        .map(|mut s| {
            let scores: Vec<i32> = s.assessments.iter().filter_map(|a| a.score).collect();
            if !scores.is_empty() {
                s.average_score =
                    scores.iter().map(|&v| f64::from(v)).sum::<f64>() / scores.len() as f64;
            }
            s
        })
        .collect()
}

/// Platform-wide counts; the average covers scored, completed linkages only.
pub fn platform_statistics(total: i64, completed: i64, average: Option<f64>) -> AssessmentStatistics {
    let completion_rate = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    AssessmentStatistics {
        total_assessments_taken: total,
        completed_assessments: completed,
        average_score: average.map(|v| (v * 100.0).round() / 100.0).unwrap_or(0.0),
        completion_rate,
    }
}

const SCORE_ROW_SELECT: &str = r#"
    SELECT ua.id, ua.user_id, ua.assessment_id, a.name AS assessment_name, ua.status, ua.score,
           COALESCE((
               SELECT SUM(q.marks)
               FROM assessment_questions aq
               JOIN questions q ON q.id = aq.question_id
               WHERE aq.assessment_id = ua.assessment_id
           ), 0)::BIGINT AS total_marks
    FROM user_assessments ua
    LEFT JOIN assessments a ON a.id = ua.assessment_id
"#;

/// Read-side views over linkages for dashboards.
#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Direct and recruiter-derived linkages, merged by assessment id.
    pub async fn my_assessments(&self, student_id: Uuid) -> Result<Vec<MyAssessment>> {
        let rows = sqlx::query_as::<_, LinkageScoreRow>(&format!(
            "{} WHERE ua.user_id = $1 ORDER BY ua.id ASC",
            SCORE_ROW_SELECT
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(merge_assessments(&rows))
    }

    pub async fn recruiter_summary_stats(&self, recruiter_id: Uuid) -> Result<RecruiterSummaryStats> {
        let rows = sqlx::query_as::<_, LinkageScoreRow>(&format!(
            "{} WHERE ua.recruiter_id = $1 ORDER BY ua.id ASC",
            SCORE_ROW_SELECT
        ))
        .bind(recruiter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(summarize(&rows))
    }

    pub async fn recruiter_students(&self, recruiter_id: Uuid) -> Result<Vec<StudentSummary>> {
        let rows = sqlx::query_as::<_, StudentLinkageRow>(
            r#"SELECT ua.id, ua.user_id, u.name AS student_name, u.email AS student_email,
                      ua.assessment_id, a.name AS assessment_name, ua.status, ua.score
               FROM user_assessments ua
               JOIN users u ON u.id = ua.user_id
               LEFT JOIN assessments a ON a.id = ua.assessment_id
               WHERE ua.recruiter_id = $1
               ORDER BY ua.id ASC"#,
        )
        .bind(recruiter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rollup_students(&rows))
    }

    pub async fn statistics(&self) -> Result<AssessmentStatistics> {
        let (total, completed, average) = sqlx::query_as::<_, (i64, i64, Option<f64>)>(
            r#"SELECT COUNT(*),
                      COUNT(*) FILTER (WHERE status = 'completed'),
                      (AVG(score) FILTER (WHERE status = 'completed'))::FLOAT8
               FROM user_assessments"#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(platform_statistics(total, completed, average))
    }
}
