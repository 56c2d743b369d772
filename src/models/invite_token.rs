use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InviteToken {
    pub id: i64,
    pub token: String,
    pub assessment_id: i64,
    pub recipient_email: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Redeemable,
    Used,
    Expired,
}

impl InviteToken {
    /// Used is terminal and is reported even once the token is also past expiry.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.used {
            TokenState::Used
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Redeemable
        }
    }
}
