use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateEmployeeRequest, User},
    error::{AppError, Result},
    service::GeneratedCode,
};

#[derive(Debug, Deserialize)]
pub struct GenerateCodeRequest {
    pub employee_id: Uuid,
}

/// Patron hands a one-time sign-in code to an employee of their company.
pub async fn generate_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<GenerateCodeRequest>,
) -> Result<Json<GeneratedCode>> {
    let generated = state
        .service_context
        .employee_auth_service
        .generate_code(req.employee_id, &current.user)
        .await?;

    Ok(Json(generated))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub country_code: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub user: User,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Public endpoint: exchanges phone + one-time code for a signed employee
/// session. The cookie carries the token; the body carries the user.
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<(CookieJar, Json<VerifyCodeResponse>)> {
    let verified = state
        .service_context
        .employee_auth_service
        .verify_code(&req.phone, &req.country_code, &req.code)
        .await?;

    let cookie = state
        .service_context
        .auth_service
        .create_employee_cookie(&verified.token, false);

    Ok((
        jar.add(cookie),
        Json(VerifyCodeResponse {
            user: verified.user,
            expires_at: verified.expires_at,
        }),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let employee = state
        .service_context
        .company_service
        .create_employee(req, &current.user)
        .await?;

    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<User>>> {
    if !current.user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    let company_id = current.user.company_id.ok_or(AppError::Forbidden)?;

    let employees = state
        .service_context
        .user_repo
        .list_by_company(company_id)
        .await?;

    Ok(Json(employees))
}
