use crate::error::{Error, Result};
use crate::models::user::User;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str =
    "id, name, email, role, recruiter_code, linked_recruiter_id, created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Caller must already exist in the local identity table.
    pub async fn require(&self, id: Uuid) -> Result<User> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::Unauthorized("Unknown identity".to_string()))
    }
}

/// Locks the identity row for the rest of the transaction.
pub(crate) async fn lock_user(conn: &mut PgConnection, id: Uuid) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| Error::Unauthorized("Unknown identity".to_string()))
}

/// First link wins; later links leave the column untouched.
pub(crate) async fn set_linked_recruiter_once(
    conn: &mut PgConnection,
    student_id: Uuid,
    recruiter_id: Uuid,
) -> Result<bool> {
    let res = sqlx::query(
        r#"UPDATE users
           SET linked_recruiter_id = $2, updated_at = NOW()
           WHERE id = $1 AND linked_recruiter_id IS NULL"#,
    )
    .bind(student_id)
    .bind(recruiter_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
