use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub company_id: Uuid,
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: TripStatus,
    /// Seats still sellable. Mutated only by payment confirmation and
    /// cancellation; never negative, never above the bus capacity.
    pub available_seats: i32,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripStatus {
    Scheduled,
    Boarding,
    Departed,
    Arrived,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "Scheduled",
            TripStatus::Boarding => "Boarding",
            TripStatus::Departed => "Departed",
            TripStatus::Arrived => "Arrived",
            TripStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Scheduled" => Some(TripStatus::Scheduled),
            "Boarding" => Some(TripStatus::Boarding),
            "Departed" => Some(TripStatus::Departed),
            "Arrived" => Some(TripStatus::Arrived),
            "Cancelled" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripRequest {
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Defaults to the route's base price when omitted.
    pub price_cents: Option<i64>,
}
