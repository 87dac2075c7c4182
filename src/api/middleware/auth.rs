use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{Role, User, UserStatus},
    error::AppError,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = extract_credential(&jar, &request).ok_or(AppError::Unauthorized)?;

    let user = resolve_user(&state, &credential)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if user.status != UserStatus::Active {
        return Err(AppError::Unauthorized);
    }

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = extract_credential(&jar, &request).ok_or(AppError::Unauthorized)?;

    let user = resolve_user(&state, &credential)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if user.status != UserStatus::Active {
        return Err(AppError::Unauthorized);
    }
    if user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

/// Session cookie first, then a bearer header.
fn extract_credential(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get("session") {
        return Some(cookie.value().to_string());
    }
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Two credential kinds share the cookie: opaque session tokens from
/// password login, and signed employee tokens from code verification.
async fn resolve_user(state: &AppState, credential: &str) -> Result<Option<User>, AppError> {
    let ctx = &state.service_context;

    if let Some(session) = ctx.auth_service.validate_session(credential).await? {
        return ctx.user_repo.find_by_id(session.user_id).await;
    }

    if let Ok(claims) = ctx.auth_service.verify_employee_token(credential) {
        let employee_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
        return ctx.user_repo.find_by_id(employee_id).await;
    }

    Ok(None)
}
