use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::state::AppState,
    auth::AuthService,
    domain::{Company, RegisterCompanyRequest, User},
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub company: Company,
    pub message: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (user, company) = state.service_context.company_service.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            company,
            message: "Registration received, awaiting approval".to_string(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let user = state
        .service_context
        .user_repo
        .find_by_email(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let password_hash = user.password_hash.clone().ok_or(AppError::Unauthorized)?;
    if !AuthService::verify_password(&req.password, &password_hash).await? {
        return Err(AppError::Unauthorized);
    }

    let (_session, token) = state
        .service_context
        .auth_service
        .create_session(user.id, state.settings.auth.session_duration_hours)
        .await?;

    let cookie = state
        .service_context
        .auth_service
        .create_session_cookie(&token, false);

    Ok((jar.add(cookie), Json(LoginResponse { user })))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(session_cookie) = jar.get("session") {
        let _ = state
            .service_context
            .auth_service
            .invalidate_session(session_cookie.value())
            .await;
    }

    let jar = jar.add(AuthService::create_logout_cookie());

    Ok((jar, StatusCode::NO_CONTENT))
}
