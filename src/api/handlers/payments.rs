use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{PaymentMethod, Reservation, Ticket},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ProcessPaymentRequest {
    pub reservation_id: Uuid,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct ProcessPaymentResponse {
    pub ticket: Ticket,
    pub reservation: Reservation,
}

/// Confirms a pending reservation: ticket out, payment recorded, seat
/// counter down, all in one unit. 404 when the reservation is unknown,
/// 409 when it is not awaiting payment.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>> {
    let outcome = state
        .service_context
        .reservation_service
        .process_payment(req.reservation_id, req.payment_method, &current.user)
        .await?;

    Ok(Json(ProcessPaymentResponse {
        ticket: outcome.ticket,
        reservation: outcome.reservation,
    }))
}
