use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proof of travel, issued only after payment completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub code: String,
    /// Base64 JSON seed carried inside the printed QR code.
    pub qr_payload: String,
    pub reservation_id: Uuid,
    pub trip_id: Uuid,
    pub company_id: Uuid,
    pub seat_number: i32,
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "Valid",
            TicketStatus::Used => "Used",
            TicketStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Valid" => Some(TicketStatus::Valid),
            "Used" => Some(TicketStatus::Used),
            "Cancelled" => Some(TicketStatus::Cancelled),
            _ => None,
        }
    }
}
