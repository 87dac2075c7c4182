use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub country_code: String,
    pub email: Option<String>,
    /// Absent for staff who sign in with access codes.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Admin,
    Patron,
    Gestionnaire,
    Caissier,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Patron => "Patron",
            Role::Gestionnaire => "Gestionnaire",
            Role::Caissier => "Caissier",
            Role::Client => "Client",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(Role::Admin),
            "Patron" => Some(Role::Patron),
            "Gestionnaire" => Some(Role::Gestionnaire),
            "Caissier" => Some(Role::Caissier),
            "Client" => Some(Role::Client),
            _ => None,
        }
    }

    /// Company staff sign in with access codes and operate under a company.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Patron | Role::Gestionnaire | Role::Caissier)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(UserStatus::Active),
            "Suspended" => Some(UserStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployeeRequest {
    pub full_name: String,
    pub phone: String,
    pub country_code: String,
    pub role: Role,
}
