// src/handlers/profile.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, session::SessionContext},
    models::profile::BuyerProfile,
};

// --- Perfil do comprador ---

#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Perfil salvo, ou null", body = BuyerProfile)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    session: SessionContext,
) -> Json<Option<BuyerProfile>> {
    Json(app_state.storage.buyer_profile(session.0))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Profile",
    request_body = BuyerProfile,
    responses(
        (status = 200, description = "Perfil salvo", body = BuyerProfile)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn save_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Json(payload): Json<BuyerProfile>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    app_state
        .storage
        .save_buyer_profile(session.0, &payload)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(payload))
}

#[utoipa::path(
    delete,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 204, description = "Perfil apagado")
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn delete_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .storage
        .clear_buyer_profile(session.0)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// --- Promoções já vistas (popup de novidades) ---

#[utoipa::path(
    get,
    path = "/api/promotions/seen",
    tag = "Profile",
    responses(
        (status = 200, description = "IDs das promoções já exibidas", body = Vec<String>)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn seen_promotions(State(app_state): State<AppState>, session: SessionContext) -> Json<Vec<String>> {
    Json(app_state.storage.seen_promotions(session.0))
}

#[utoipa::path(
    post,
    path = "/api/promotions/{id}/seen",
    tag = "Profile",
    responses(
        (status = 200, description = "Promoção marcada como vista", body = Vec<String>)
    ),
    params(
        ("id" = String, Path, description = "ID da promoção"),
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn mark_promotion_seen(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(promotion_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let seen = app_state
        .storage
        .mark_promotion_seen(session.0, &promotion_id)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(seen))
}
