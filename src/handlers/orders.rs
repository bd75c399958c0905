// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AdminSession, i18n::Locale, session::SessionContext},
    models::order::{CheckoutRequest, Dispatch, Order, OrderFilter, OrderStatus},
};

// =============================================================================
//  CLIENTE
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/orders/whatsapp",
    tag = "Orders",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Link do WhatsApp com o pedido pronto para envio", body = Dispatch),
        (status = 400, description = "Carrinho vazio ou dados obrigatórios ausentes")
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn submit_whatsapp(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state.cart_service.cart(session.0);
    let profile = app_state.storage.buyer_profile(session.0);

    let submission = app_state
        .order_service
        .submit_whatsapp(&cart, profile.as_ref(), &payload)
        .map_err(|e| e.to_api_error(&locale))?;

    // Pedido enviado: carrinho novo. Falha aqui não invalida o envio.
    if let Err(e) = app_state.cart_service.clear(session.0) {
        tracing::warn!("⚠️ Carrinho da sessão {} não foi limpo: {}", session.0, e);
    }

    // A gravação de auditoria segue sozinha em segundo plano
    Ok(Json(submission.dispatch))
}

#[utoipa::path(
    post,
    path = "/api/orders/call",
    tag = "Orders",
    responses(
        (status = 200, description = "Link tel: da pizzaria", body = Dispatch)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn call_shop(State(app_state): State<AppState>, session: SessionContext) -> Json<Dispatch> {
    let cart = app_state.cart_service.cart(session.0);
    let profile = app_state.storage.buyer_profile(session.0);

    Json(app_state.order_service.call(&cart, profile.as_ref()).dispatch)
}

// =============================================================================
//  PAINEL
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Admin",
    params(OrderFilter),
    responses(
        (status = 200, description = "Pedidos filtrados, mais recentes primeiro", body = Vec<Order>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = app_state
        .order_service
        .list_orders(&filter)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    tag = "Admin",
    responses(
        (status = 200, description = "Pedido", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .get_order(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    tag = "Admin",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status alterado (qualquer transição é aceita)", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do pedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .change_status(id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(order))
}
