use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short-lived one-time sign-in code for company staff. Stored in its own
/// table with an explicit expiry and a consumed marker; a code is usable
/// exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCode {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessCode {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}
