// src/handlers/loyalty.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AdminSession, i18n::Locale, session::SessionContext},
    models::loyalty::{BulkSyncReport, LoyaltyAccount, LoyaltySubject},
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheInvalidation {
    pub removed: usize,
}

// =============================================================================
//  CLIENTE
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/loyalty/me",
    tag = "Loyalty",
    responses(
        (status = 200, description = "Pontos do perfil salvo na sessão", body = LoyaltyAccount),
        (status = 404, description = "Sessão sem perfil")
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn my_account(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state
        .storage
        .buyer_profile(session.0)
        .ok_or_else(|| AppError::CustomerNotFound.to_api_error(&locale))?;

    // Com cadastro usa o vínculo já salvo; sem cadastro resolve só para agora
    let account = match profile.customer_id {
        Some(customer_id) => app_state
            .loyalty_service
            .account_for_customer(customer_id)
            .await
            .map_err(|e| e.to_api_error(&locale))?,
        None => {
            app_state
                .loyalty_service
                .sync(&LoyaltySubject::from(&profile))
                .await
        }
    };

    Ok(Json(account))
}

#[utoipa::path(
    get,
    path = "/api/loyalty/{customer_id}",
    tag = "Loyalty",
    responses(
        (status = 200, description = "Pontos do cliente (status indica cache, não encontrado, ambíguo ou CRM fora)", body = LoyaltyAccount),
        (status = 404, description = "Cliente não cadastrado")
    ),
    params(
        ("customer_id" = Uuid, Path, description = "ID do cliente")
    )
)]
pub async fn get_account(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let account = app_state
        .loyalty_service
        .account_for_customer(customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(account))
}

// =============================================================================
//  PAINEL
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/admin/loyalty/sync",
    tag = "Admin",
    responses(
        (status = 200, description = "Relatório da sincronização em massa", body = BulkSyncReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_sync(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .loyalty_service
        .sync_all()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(report))
}

#[utoipa::path(
    delete,
    path = "/api/admin/loyalty/cache",
    tag = "Admin",
    responses(
        (status = 200, description = "Cache de pontos esvaziado", body = CacheInvalidation)
    ),
    security(("api_jwt" = []))
)]
pub async fn flush_cache(State(app_state): State<AppState>, _admin: AdminSession) -> Json<CacheInvalidation> {
    Json(CacheInvalidation {
        removed: app_state.loyalty_service.flush_points_cache(),
    })
}

#[utoipa::path(
    delete,
    path = "/api/admin/loyalty/cache/{crm_id}",
    tag = "Admin",
    responses(
        (status = 200, description = "Entrada do cache descartada", body = CacheInvalidation)
    ),
    params(
        ("crm_id" = String, Path, description = "ID do cliente no CRM")
    ),
    security(("api_jwt" = []))
)]
pub async fn invalidate_cache_entry(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(crm_id): Path<String>,
) -> Json<CacheInvalidation> {
    let removed = app_state.loyalty_service.invalidate_points(&crm_id);
    Json(CacheInvalidation {
        removed: usize::from(removed),
    })
}

#[utoipa::path(
    delete,
    path = "/api/admin/loyalty/{customer_id}/link",
    tag = "Admin",
    responses(
        (status = 204, description = "Vínculo com o CRM desfeito"),
        (status = 404, description = "Cliente não cadastrado")
    ),
    params(
        ("customer_id" = Uuid, Path, description = "ID do cliente")
    ),
    security(("api_jwt" = []))
)]
pub async fn unlink(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .loyalty_service
        .unlink(customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
