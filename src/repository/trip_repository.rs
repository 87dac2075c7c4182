use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Trip, TripStatus},
    error::{AppError, Result},
    repository::TripRepository,
};

#[derive(FromRow)]
struct TripRow {
    id: String,
    company_id: String,
    route_id: String,
    bus_id: String,
    departure_time: NaiveDateTime,
    arrival_time: NaiveDateTime,
    status: String,
    available_seats: i32,
    price_cents: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const TRIP_COLUMNS: &str = "id, company_id, route_id, bus_id, departure_time, arrival_time, \
                            status, available_seats, price_cents, created_at, updated_at";

pub struct SqliteTripRepository {
    pool: SqlitePool,
}

impl SqliteTripRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_trip(row: TripRow) -> Result<Trip> {
        Ok(Trip {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            company_id: Uuid::parse_str(&row.company_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            route_id: Uuid::parse_str(&row.route_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            bus_id: Uuid::parse_str(&row.bus_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            departure_time: DateTime::from_naive_utc_and_offset(row.departure_time, Utc),
            arrival_time: DateTime::from_naive_utc_and_offset(row.arrival_time, Utc),
            status: TripStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid trip status: {}", row.status)))?,
            available_seats: row.available_seats,
            price_cents: row.price_cents,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl TripRepository for SqliteTripRepository {
    async fn create(&self, trip: Trip) -> Result<Trip> {
        let id_str = trip.id.to_string();
        let company_id_str = trip.company_id.to_string();
        let route_id_str = trip.route_id.to_string();
        let bus_id_str = trip.bus_id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO trips (
                id, company_id, route_id, bus_id, departure_time, arrival_time,
                status, available_seats, price_cents, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&company_id_str)
        .bind(&route_id_str)
        .bind(&bus_id_str)
        .bind(trip.departure_time.naive_utc())
        .bind(trip.arrival_time.naive_utc())
        .bind(trip.status.as_str())
        .bind(trip.available_seats)
        .bind(trip.price_cents)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(trip.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created trip".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Trip>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?"
        ))
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_trip(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<Trip>> {
        let company_id_str = company_id.to_string();
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE company_id = ? ORDER BY departure_time"
        ))
        .bind(company_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_trip).collect()
    }

    async fn search(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
        after: DateTime<Utc>,
    ) -> Result<Vec<Trip>> {
        let after_naive = after.naive_utc();
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT t.id, t.company_id, t.route_id, t.bus_id, t.departure_time,
                   t.arrival_time, t.status, t.available_seats, t.price_cents,
                   t.created_at, t.updated_at
            FROM trips t
            JOIN routes r ON r.id = t.route_id
            JOIN companies c ON c.id = t.company_id
            WHERE t.status = 'Scheduled'
              AND c.status = 'Approved'
              AND t.departure_time > ?
              AND (? IS NULL OR r.origin = ?)
              AND (? IS NULL OR r.destination = ?)
            ORDER BY t.departure_time
            "#,
        )
        .bind(after_naive)
        .bind(origin)
        .bind(origin)
        .bind(destination)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_trip).collect()
    }

    async fn update_status(&self, id: Uuid, status: TripStatus) -> Result<Trip> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        let result = sqlx::query("UPDATE trips SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Trip not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated trip".to_string())
        })
    }
}
