use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::{handlers::fleet::managed_company, middleware::auth::CurrentUser, state::AppState},
    domain::{AuditAction, AuditRecord, CreateTripRequest, Trip, TripStatus},
    error::{AppError, Result},
    events,
};

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>)> {
    let company_id = managed_company(&current.user)?;
    let ctx = &state.service_context;

    let route = ctx
        .fleet_repo
        .find_route(req.route_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
    let bus = ctx
        .fleet_repo
        .find_bus(req.bus_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".to_string()))?;

    if route.company_id != company_id || bus.company_id != company_id {
        return Err(AppError::Forbidden);
    }
    if req.arrival_time <= req.departure_time {
        return Err(AppError::BadRequest(
            "Arrival must be after departure".to_string(),
        ));
    }
    if req.departure_time <= Utc::now() {
        return Err(AppError::BadRequest("Departure must be in the future".to_string()));
    }

    let trip = ctx
        .trip_repo
        .create(Trip {
            id: Uuid::new_v4(),
            company_id,
            route_id: req.route_id,
            bus_id: req.bus_id,
            departure_time: req.departure_time,
            arrival_time: req.arrival_time,
            status: TripStatus::Scheduled,
            available_seats: bus.capacity,
            price_cents: req.price_cents.unwrap_or(route.base_price_cents),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn list_company(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Trip>>> {
    if !current.user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    let company_id = current.user.company_id.ok_or(AppError::Forbidden)?;

    let trips = state.service_context.trip_repo.list_by_company(company_id).await?;
    Ok(Json(trips))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Departures strictly after this instant; defaults to now.
    pub after: Option<DateTime<Utc>>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Trip>>> {
    let trips = state
        .service_context
        .trip_repo
        .search(
            params.origin.as_deref(),
            params.destination.as_deref(),
            params.after.unwrap_or_else(Utc::now),
        )
        .await?;

    Ok(Json(trips))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>> {
    let trip = state
        .service_context
        .trip_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    Ok(Json(trip))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TripStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Trip>> {
    if !current.user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    let ctx = &state.service_context;

    let trip = ctx
        .trip_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    if current.user.company_id != Some(trip.company_id) {
        return Err(AppError::Forbidden);
    }
    if matches!(trip.status, TripStatus::Arrived | TripStatus::Cancelled) {
        return Err(AppError::InvalidState("Trip has already ended".to_string()));
    }

    let updated = ctx.trip_repo.update_status(id, req.status).await?;

    ctx.audit_repo
        .record(AuditRecord {
            id: Uuid::new_v4(),
            actor_id: current.user.id,
            company_id: Some(trip.company_id),
            action: AuditAction::TripStatusChanged,
            description: format!("Trip {} is now {}", id, updated.status.as_str()),
            metadata: json!({"trip_id": id, "status": updated.status}),
            created_at: Utc::now(),
        })
        .await?;

    ctx.event_bus
        .publish(
            &events::company_room(trip.company_id),
            events::TRIP_STATUS_UPDATED,
            json!({"trip_id": id, "status": updated.status}),
        )
        .await;

    Ok(Json(updated))
}
