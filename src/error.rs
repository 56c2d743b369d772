use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid invitation token")]
    InviteNotFound,

    #[error("This invitation has already been used")]
    InviteAlreadyUsed,

    #[error("This invitation has expired")]
    InviteExpired,

    #[error("Assessment not found for this invitation")]
    AssessmentMissing,

    #[error("Invalid recruiter code")]
    InvalidRecruiterCode,

    #[error("You are already linked to this recruiter")]
    AlreadyLinked,

    #[error("Assessment marks exceed the storable score range")]
    ScoreOverflow,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => "bad_request",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::InviteNotFound => "invite_not_found",
            Error::InviteAlreadyUsed => "invite_already_used",
            Error::InviteExpired => "invite_expired",
            Error::AssessmentMissing => "assessment_not_found",
            Error::InvalidRecruiterCode => "invalid_recruiter_code",
            Error::AlreadyLinked => "already_linked",
            Error::Database(_) => "persistence_failure",
            Error::ScoreOverflow => "score_overflow",
            Error::Reqwest(_) => "upstream_error",
            Error::Config(_) | Error::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::InvalidRecruiterCode => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::InviteNotFound | Error::AssessmentMissing => {
                StatusCode::NOT_FOUND
            }
            Error::InviteAlreadyUsed | Error::AlreadyLinked => StatusCode::CONFLICT,
            Error::InviteExpired => StatusCode::GONE,
            Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Database(_) | Error::ScoreOverflow | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            Error::Database(err) => {
                tracing::error!(error = ?err, "persistence failure");
                "A storage error occurred, no changes were applied".to_string()
            }
            Error::Config(msg) | Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "error": self.code(), "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

/// True when the error is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
