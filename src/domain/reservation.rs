use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub company_id: Uuid,
    /// Walk-in sales at the counter have no account behind them.
    pub user_id: Option<Uuid>,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub seat_number: i32,
    pub status: ReservationStatus,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Confirmed => "Confirmed",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ReservationStatus::Pending),
            "Confirmed" => Some(ReservationStatus::Confirmed),
            "Cancelled" => Some(ReservationStatus::Cancelled),
            "Completed" => Some(ReservationStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub trip_id: Uuid,
    /// Lowest free seat is assigned when omitted.
    pub seat_number: Option<i32>,
    #[validate(length(min = 2, max = 120))]
    pub passenger_name: String,
    #[validate(length(min = 6, max = 20))]
    pub passenger_phone: String,
}
