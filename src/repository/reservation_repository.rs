use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Reservation, ReservationStatus},
    error::{AppError, Result},
    repository::ReservationRepository,
};

#[derive(FromRow)]
pub(crate) struct ReservationRow {
    pub id: String,
    pub trip_id: String,
    pub company_id: String,
    pub user_id: Option<String>,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub seat_number: i32,
    pub status: String,
    pub total_amount_cents: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, trip_id, company_id, user_id, passenger_name, passenger_phone, \
     seat_number, status, total_amount_cents, created_at, updated_at";

pub(crate) fn row_to_reservation(row: ReservationRow) -> Result<Reservation> {
    Ok(Reservation {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        trip_id: Uuid::parse_str(&row.trip_id).map_err(|e| AppError::Database(e.to_string()))?,
        company_id: Uuid::parse_str(&row.company_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        user_id: row
            .user_id
            .map(|id| Uuid::parse_str(&id))
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?,
        passenger_name: row.passenger_name,
        passenger_phone: row.passenger_phone,
        seat_number: row.seat_number,
        status: ReservationStatus::parse(&row.status).ok_or_else(|| {
            AppError::Database(format!("Invalid reservation status: {}", row.status))
        })?,
        total_amount_cents: row.total_amount_cents,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub struct SqliteReservationRepository {
    pool: SqlitePool,
}

impl SqliteReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for SqliteReservationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?"
        ))
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_reservation(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Reservation>> {
        let user_id_str = user_id.to_string();
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_reservation).collect()
    }

    async fn list_by_trip(&self, trip_id: Uuid) -> Result<Vec<Reservation>> {
        let trip_id_str = trip_id.to_string();
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE trip_id = ? ORDER BY seat_number"
        ))
        .bind(trip_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_reservation).collect()
    }
}
