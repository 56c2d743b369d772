use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One assessment assigned to one student, optionally attributed to a recruiter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAssessment {
    pub id: i64,
    pub user_id: Uuid,
    pub assessment_id: i64,
    pub recruiter_id: Option<Uuid>,
    pub status: String,
    pub score: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserAssessment {
    pub fn status(&self) -> Option<AssessmentStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentStatus {
    Invited,
    Pending,
    Started,
    Completed,
}

impl AssessmentStatus {
    /// Column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Invited => "invited",
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Started => "started",
            AssessmentStatus::Completed => "completed",
        }
    }

    pub fn is_attempted(&self) -> bool {
        matches!(self, AssessmentStatus::Started | AssessmentStatus::Completed)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, AssessmentStatus::Invited | AssessmentStatus::Pending)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "invited" => Ok(AssessmentStatus::Invited),
            "pending" => Ok(AssessmentStatus::Pending),
            "started" => Ok(AssessmentStatus::Started),
            "completed" => Ok(AssessmentStatus::Completed),
            other => Err(format!("unknown assessment status: {}", other)),
        }
    }
}
