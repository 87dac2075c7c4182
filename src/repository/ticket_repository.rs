use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Ticket, TicketStatus},
    error::{AppError, Result},
    repository::TicketRepository,
};

#[derive(FromRow)]
pub(crate) struct TicketRow {
    pub id: String,
    pub code: String,
    pub qr_payload: String,
    pub reservation_id: String,
    pub trip_id: String,
    pub company_id: String,
    pub seat_number: i32,
    pub status: String,
    pub issued_at: NaiveDateTime,
}

pub(crate) const TICKET_COLUMNS: &str =
    "id, code, qr_payload, reservation_id, trip_id, company_id, seat_number, status, issued_at";

pub(crate) fn row_to_ticket(row: TicketRow) -> Result<Ticket> {
    Ok(Ticket {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        code: row.code,
        qr_payload: row.qr_payload,
        reservation_id: Uuid::parse_str(&row.reservation_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        trip_id: Uuid::parse_str(&row.trip_id).map_err(|e| AppError::Database(e.to_string()))?,
        company_id: Uuid::parse_str(&row.company_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        seat_number: row.seat_number,
        status: TicketStatus::parse(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid ticket status: {}", row.status)))?,
        issued_at: DateTime::from_naive_utc_and_offset(row.issued_at, Utc),
    })
}

pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE code = ?"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_ticket(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_reservation(&self, reservation_id: Uuid) -> Result<Option<Ticket>> {
        let reservation_id_str = reservation_id.to_string();
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE reservation_id = ? ORDER BY issued_at DESC"
        ))
        .bind(reservation_id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_ticket(r)?)),
            None => Ok(None),
        }
    }
}
