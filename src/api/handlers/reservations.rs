use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateReservationRequest, Reservation},
    error::{AppError, Result},
};

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reservation = state
        .service_context
        .reservation_service
        .create_reservation(req, &current.user)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Reservation>>> {
    let reservations = state
        .service_context
        .reservation_repo
        .list_by_user(current.user.id)
        .await?;

    Ok(Json(reservations))
}

pub async fn list_by_trip(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>> {
    if !current.user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    let ctx = &state.service_context;

    let trip = ctx
        .trip_repo
        .find_by_id(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;
    if current.user.company_id != Some(trip.company_id) {
        return Err(AppError::Forbidden);
    }

    let reservations = ctx.reservation_repo.list_by_trip(trip_id).await?;
    Ok(Json(reservations))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub reservation: Reservation,
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>> {
    let reservation = state
        .service_context
        .reservation_service
        .cancel_reservation(id, &current.user)
        .await?;

    Ok(Json(CancelResponse {
        message: "Reservation cancelled".to_string(),
        reservation,
    }))
}
