use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Bus, Route},
    error::{AppError, Result},
    repository::FleetRepository,
};

#[derive(FromRow)]
struct BusRow {
    id: String,
    company_id: String,
    plate_number: String,
    model: String,
    capacity: i32,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct RouteRow {
    id: String,
    company_id: String,
    origin: String,
    destination: String,
    duration_minutes: i32,
    base_price_cents: i64,
    created_at: NaiveDateTime,
}

pub struct SqliteFleetRepository {
    pool: SqlitePool,
}

impl SqliteFleetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_bus(row: BusRow) -> Result<Bus> {
        Ok(Bus {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            company_id: Uuid::parse_str(&row.company_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            plate_number: row.plate_number,
            model: row.model,
            capacity: row.capacity,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_route(row: RouteRow) -> Result<Route> {
        Ok(Route {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            company_id: Uuid::parse_str(&row.company_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            origin: row.origin,
            destination: row.destination,
            duration_minutes: row.duration_minutes,
            base_price_cents: row.base_price_cents,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl FleetRepository for SqliteFleetRepository {
    async fn create_bus(&self, bus: Bus) -> Result<Bus> {
        let id_str = bus.id.to_string();
        let company_id_str = bus.company_id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO buses (id, company_id, plate_number, model, capacity, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&company_id_str)
        .bind(&bus.plate_number)
        .bind(&bus.model)
        .bind(bus.capacity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Plate number already registered".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        self.find_bus(bus.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created bus".to_string())
        })
    }

    async fn find_bus(&self, id: Uuid) -> Result<Option<Bus>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, BusRow>(
            "SELECT id, company_id, plate_number, model, capacity, created_at FROM buses WHERE id = ?",
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_bus(r)?)),
            None => Ok(None),
        }
    }

    async fn list_buses(&self, company_id: Uuid) -> Result<Vec<Bus>> {
        let company_id_str = company_id.to_string();
        let rows = sqlx::query_as::<_, BusRow>(
            r#"
            SELECT id, company_id, plate_number, model, capacity, created_at
            FROM buses
            WHERE company_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(company_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_bus).collect()
    }

    async fn create_route(&self, route: Route) -> Result<Route> {
        let id_str = route.id.to_string();
        let company_id_str = route.company_id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO routes (
                id, company_id, origin, destination, duration_minutes,
                base_price_cents, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&company_id_str)
        .bind(&route.origin)
        .bind(&route.destination)
        .bind(route.duration_minutes)
        .bind(route.base_price_cents)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_route(route.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created route".to_string())
        })
    }

    async fn find_route(&self, id: Uuid) -> Result<Option<Route>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            SELECT id, company_id, origin, destination, duration_minutes,
                   base_price_cents, created_at
            FROM routes
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_route(r)?)),
            None => Ok(None),
        }
    }

    async fn list_routes(&self, company_id: Uuid) -> Result<Vec<Route>> {
        let company_id_str = company_id.to_string();
        let rows = sqlx::query_as::<_, RouteRow>(
            r#"
            SELECT id, company_id, origin, destination, duration_minutes,
                   base_price_cents, created_at
            FROM routes
            WHERE company_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(company_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_route).collect()
    }
}
