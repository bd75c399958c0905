// src/handlers/admin.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, session::MaybeSession},
    models::admin::{AdminLoginPayload, AuthResponse},
};

#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Admin",
    request_body = AdminLoginPayload,
    responses(
        (status = 200, description = "Token do painel (12 h)", body = AuthResponse),
        (status = 401, description = "Senha errada")
    ),
    params(
        ("x-session-id" = Option<Uuid>, Header, description = "Sessão onde o flag de admin é gravado")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    session: MaybeSession,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let token = app_state
        .admin_auth
        .login(&payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    if let Some(session_id) = session.0 {
        app_state
            .storage
            .set_admin_session(session_id, true)
            .map_err(|e| e.to_api_error(&locale))?;
    }

    tracing::info!("🔓 Login no painel");
    Ok(Json(AuthResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/admin/logout",
    tag = "Admin",
    responses(
        (status = 204, description = "Flag de admin removido da sessão")
    ),
    params(
        ("x-session-id" = Option<Uuid>, Header, description = "Sessão do painel")
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    locale: Locale,
    session: MaybeSession,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = session.0 {
        app_state
            .storage
            .set_admin_session(session_id, false)
            .map_err(|e| e.to_api_error(&locale))?;
    }

    Ok(StatusCode::NO_CONTENT)
}
