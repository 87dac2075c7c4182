use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: Uuid,
    pub company_id: Uuid,
    pub plate_number: String,
    pub model: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub company_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub duration_minutes: i32,
    pub base_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBusRequest {
    #[validate(length(min = 2, max = 20))]
    pub plate_number: String,
    #[validate(length(min = 1, max = 80))]
    pub model: String,
    #[validate(range(min = 1, max = 120))]
    pub capacity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub origin: String,
    #[validate(length(min = 1, max = 120))]
    pub destination: String,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
    #[validate(range(min = 0))]
    pub base_price_cents: i64,
}
