use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use qrcode::{render::svg, QrCode};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::Ticket,
    error::{AppError, Result},
};

async fn load_authorized(
    state: &AppState,
    current: &CurrentUser,
    code: &str,
) -> Result<Ticket> {
    let ctx = &state.service_context;
    let ticket = ctx
        .ticket_repo
        .find_by_code(code)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    // Company staff (the QR scan path at boarding) or the passenger who
    // holds the reservation.
    if current.user.role.is_staff() && current.user.company_id == Some(ticket.company_id) {
        return Ok(ticket);
    }
    let reservation = ctx
        .reservation_repo
        .find_by_id(ticket.reservation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;
    if reservation.user_id == Some(current.user.id) {
        return Ok(ticket);
    }

    Err(AppError::Forbidden)
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(code): Path<String>,
) -> Result<Json<Ticket>> {
    let ticket = load_authorized(&state, &current, &code).await?;
    Ok(Json(ticket))
}

pub async fn qr_svg(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse> {
    let ticket = load_authorized(&state, &current, &code).await?;

    let qr = QrCode::new(ticket.qr_payload.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let image = qr
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .build();

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], image))
}
