use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{AuditRecord, Company},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    company_id: Option<Uuid>,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Company>>> {
    let companies = state
        .service_context
        .company_repo
        .list(params.limit, params.offset)
        .await?;

    Ok(Json(companies))
}

pub async fn approve_company(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>> {
    let company = state
        .service_context
        .company_service
        .approve(id, &current.user)
        .await?;

    Ok(Json(company))
}

pub async fn suspend_company(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>> {
    let company = state
        .service_context
        .company_service
        .suspend(id, &current.user)
        .await?;

    Ok(Json(company))
}

pub async fn audit_log(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AuditRecord>>> {
    let records = state
        .service_context
        .audit_repo
        .list(params.company_id, params.limit, params.offset)
        .await?;

    Ok(Json(records))
}

#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub companies: i64,
    pub trips: i64,
    pub reservations: i64,
    pub tickets: i64,
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<Json<PlatformStats>> {
    let pool = &state.service_context.db_pool;

    let companies = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
        .fetch_one(pool)
        .await?;
    let trips = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trips")
        .fetch_one(pool)
        .await?;
    let reservations = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations")
        .fetch_one(pool)
        .await?;
    let tickets = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets")
        .fetch_one(pool)
        .await?;

    Ok(Json(PlatformStats {
        companies,
        trips,
        reservations,
        tickets,
    }))
}
