use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::User,
    error::{AppError, Result},
    events::{self, BusEvent},
};

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    pub room: String,
}

/// WebSocket side of the relay: joins one room and forwards its events as
/// JSON text frames. Best effort only; a lagging client just misses events.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<SubscribeParams>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    authorize_room(&current.user, &params.room)?;

    let receiver = state
        .service_context
        .event_bus
        .subscribe(&params.room)
        .await;

    Ok(ws.on_upgrade(move |socket| forward(socket, receiver)))
}

/// A user may join their own room; staff may join their company's room.
fn authorize_room(user: &User, room: &str) -> Result<()> {
    if room == events::user_room(user.id) {
        return Ok(());
    }
    if user.role.is_staff() {
        if let Some(company_id) = user.company_id {
            if room == events::company_room(company_id) {
                return Ok(());
            }
        }
    }
    Err(AppError::Forbidden)
}

async fn forward(mut socket: WebSocket, mut receiver: broadcast::Receiver<BusEvent>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!("Relay subscriber lagged, {} events dropped", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
