use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub status: CompanyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompanyStatus {
    Pending,
    Approved,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Pending => "Pending",
            CompanyStatus::Approved => "Approved",
            CompanyStatus::Suspended => "Suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(CompanyStatus::Pending),
            "Approved" => Some(CompanyStatus::Approved),
            "Suspended" => Some(CompanyStatus::Suspended),
            _ => None,
        }
    }
}

/// Registration payload: creates the patron account and the pending company
/// together, as one transaction.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterCompanyRequest {
    #[validate(length(min = 2, max = 120))]
    pub company_name: String,
    #[validate(length(min = 2, max = 120))]
    pub full_name: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 5))]
    pub country_code: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}
