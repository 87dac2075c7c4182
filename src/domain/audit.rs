use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub company_id: Option<Uuid>,
    pub action: AuditAction,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    CompanyRegistered,
    CompanyApproved,
    CompanySuspended,
    EmployeeCreated,
    CodeGenerated,
    ReservationCreated,
    PaymentCompleted,
    ReservationCancelled,
    TripStatusChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CompanyRegistered => "CompanyRegistered",
            AuditAction::CompanyApproved => "CompanyApproved",
            AuditAction::CompanySuspended => "CompanySuspended",
            AuditAction::EmployeeCreated => "EmployeeCreated",
            AuditAction::CodeGenerated => "CodeGenerated",
            AuditAction::ReservationCreated => "ReservationCreated",
            AuditAction::PaymentCompleted => "PaymentCompleted",
            AuditAction::ReservationCancelled => "ReservationCancelled",
            AuditAction::TripStatusChanged => "TripStatusChanged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CompanyRegistered" => Some(AuditAction::CompanyRegistered),
            "CompanyApproved" => Some(AuditAction::CompanyApproved),
            "CompanySuspended" => Some(AuditAction::CompanySuspended),
            "EmployeeCreated" => Some(AuditAction::EmployeeCreated),
            "CodeGenerated" => Some(AuditAction::CodeGenerated),
            "ReservationCreated" => Some(AuditAction::ReservationCreated),
            "PaymentCompleted" => Some(AuditAction::PaymentCompleted),
            "ReservationCancelled" => Some(AuditAction::ReservationCancelled),
            "TripStatusChanged" => Some(AuditAction::TripStatusChanged),
            _ => None,
        }
    }
}
