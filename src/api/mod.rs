pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))

        // Employee code sign-in
        .nest("/employee", employee_routes(app_state.clone()))

        // API routes
        .nest("/api", api_routes(app_state.clone()))

        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))

        // Event relay subscription
        .route(
            "/ws",
            get(handlers::relay::subscribe).route_layer(axum::middleware::from_fn_with_state(
                app_state.clone(),
                middleware::auth::require_auth,
            )),
        )

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn employee_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public: exchanges phone + one-time code for a session
        .route("/verify", post(handlers::employees::verify))
        // Patron-only code generation, behind auth
        .nest(
            "/",
            Router::new()
                .route("/generate-code", post(handlers::employees::generate_code))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_auth,
                )),
        )
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/trips", trip_routes(state.clone()))
        .nest("/buses", bus_routes(state.clone()))
        .nest("/routes", route_routes(state.clone()))
        .nest("/employees", staff_routes(state.clone()))
        .nest("/reservations", reservation_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/tickets", ticket_routes(state.clone()))
}

fn trip_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public routes (no auth required for searching)
        .route("/", get(handlers::trips::search))
        .route("/:id", get(handlers::trips::get))
        // Protected routes - company staff only
        .nest(
            "/",
            Router::new()
                .route("/", post(handlers::trips::create))
                .route("/company", get(handlers::trips::list_company))
                .route("/:id/status", post(handlers::trips::update_status))
                .route("/:id/reservations", get(handlers::reservations::list_by_trip))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_auth,
                )),
        )
}

fn bus_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::fleet::list_buses))
        .route("/", post(handlers::fleet::create_bus))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn route_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::fleet::list_routes))
        .route("/", post(handlers::fleet::create_route))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn staff_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::employees::list))
        .route("/", post(handlers::employees::create))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn reservation_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::reservations::create))
        .route("/mine", get(handlers::reservations::mine))
        .route("/:id/cancel", post(handlers::reservations::cancel))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn payment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::payments::create))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn ticket_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:code", get(handlers::tickets::get))
        .route("/:code/qr.svg", get(handlers::tickets::qr_svg))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/companies", get(handlers::admin::list_companies))
        .route("/companies/:id/approve", post(handlers::admin::approve_company))
        .route("/companies/:id/suspend", post(handlers::admin::suspend_company))
        .route("/audit-log", get(handlers::admin::audit_log))
        .route("/stats", get(handlers::admin::stats))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ))
        .with_state(state)
}
