use std::future::Future;

use crate::error::{is_unique_violation, Error, Result};
use crate::services::user_service::UserService;
use crate::utils::token::generate_recruiter_code;
use sqlx::PgPool;
use uuid::Uuid;

/// Upper bound on draws before giving up; 36^8 makes a second draw already rare.
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// Draws from `generate` until `taken` reports a free value.
pub async fn unique_code_with<G, F, Fut>(mut generate: G, mut taken: F) -> Result<String>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate();
        if !taken(code.clone()).await? {
            return Ok(code);
        }
        tracing::debug!(attempt, "recruiter code collision, drawing again");
    }
    Err(Error::Internal(format!(
        "No free recruiter code after {} attempts",
        MAX_CODE_ATTEMPTS
    )))
}

#[derive(Clone)]
pub struct CodeService {
    pool: PgPool,
    users: UserService,
}

impl CodeService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            pool,
        }
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE recruiter_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn generate_unique_recruiter_code(&self) -> Result<String> {
        unique_code_with(generate_recruiter_code, |code| async move {
            self.code_exists(&code).await
        })
        .await
    }

    /// Returns the identity's code, assigning one on first use.
    pub async fn ensure_recruiter_code(&self, user_id: Uuid) -> Result<String> {
        let user = self.users.require(user_id).await?;
        let can_recruit = user.role().map(|r| r.can_recruit()).unwrap_or(false);
        if !can_recruit {
            return Err(Error::Forbidden(
                "Only recruiters and admins hold a recruiter code".to_string(),
            ));
        }
        if let Some(code) = user.recruiter_code {
            return Ok(code);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = self.generate_unique_recruiter_code().await?;
            // COALESCE keeps a code set by a concurrent first use.
            let assigned = sqlx::query_scalar::<_, String>(
                r#"UPDATE users
                   SET recruiter_code = COALESCE(recruiter_code, $1), updated_at = NOW()
                   WHERE id = $2
                   RETURNING recruiter_code"#,
            )
            .bind(&candidate)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await;

            match assigned {
                Ok(code) => {
                    if code == candidate {
                        tracing::info!(%user_id, "assigned recruiter code");
                    }
                    return Ok(code);
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(%user_id, "recruiter code taken between check and write, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Internal("Could not assign a recruiter code".to_string()))
    }
}
