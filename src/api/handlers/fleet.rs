use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Bus, CreateBusRequest, CreateRouteRequest, Role, Route, User},
    error::{AppError, Result},
};

/// Fleet management is for patron and gestionnaire, scoped to their company.
pub(crate) fn managed_company(user: &User) -> Result<Uuid> {
    if !matches!(user.role, Role::Patron | Role::Gestionnaire) {
        return Err(AppError::Forbidden);
    }
    user.company_id.ok_or(AppError::Forbidden)
}

pub async fn create_bus(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateBusRequest>,
) -> Result<(StatusCode, Json<Bus>)> {
    let company_id = managed_company(&current.user)?;
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let bus = state
        .service_context
        .fleet_repo
        .create_bus(Bus {
            id: Uuid::new_v4(),
            company_id,
            plate_number: req.plate_number,
            model: req.model,
            capacity: req.capacity,
            created_at: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(bus)))
}

pub async fn list_buses(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Bus>>> {
    let company_id = managed_company(&current.user)?;
    let buses = state.service_context.fleet_repo.list_buses(company_id).await?;
    Ok(Json(buses))
}

pub async fn create_route(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<Route>)> {
    let company_id = managed_company(&current.user)?;
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let route = state
        .service_context
        .fleet_repo
        .create_route(Route {
            id: Uuid::new_v4(),
            company_id,
            origin: req.origin,
            destination: req.destination,
            duration_minutes: req.duration_minutes,
            base_price_cents: req.base_price_cents,
            created_at: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn list_routes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Route>>> {
    let company_id = managed_company(&current.user)?;
    let routes = state.service_context.fleet_repo.list_routes(company_id).await?;
    Ok(Json(routes))
}
