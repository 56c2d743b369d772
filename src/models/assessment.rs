use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Minutes.
    pub duration: i32,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
