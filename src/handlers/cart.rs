// src/handlers/cart.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, session::SessionContext},
    models::{
        cart::{Cart, CartCount},
        menu::{Modification, Product},
    },
};

fn default_quantity() -> u32 {
    1
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemPayload {
    // Cópia do produto do cardápio (o catálogo fica fora deste serviço)
    pub product: Product,

    #[validate(range(min = 1, max = 99, message = "invalid_quantity"))]
    #[serde(default = "default_quantity")]
    #[schema(example = 2)]
    pub quantity: u32,

    #[schema(example = "Ben cotta")]
    pub notes: Option<String>,

    #[serde(default)]
    pub modifications: Vec<Modification>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityPayload {
    // <= 0 remove a linha; acima do teto vira o teto
    #[schema(example = 3)]
    pub quantity: i64,
}

// ---
// Handlers
// ---
#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    responses(
        (status = 200, description = "Carrinho da sessão (vazio se não houver)", body = Cart)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn get_cart(State(app_state): State<AppState>, session: SessionContext) -> Json<Cart> {
    Json(app_state.cart_service.cart(session.0))
}

#[utoipa::path(
    get,
    path = "/api/cart/count",
    tag = "Cart",
    responses(
        (status = 200, description = "Quantidade total de itens (badge)", body = CartCount)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn get_count(State(app_state): State<AppState>, session: SessionContext) -> Json<CartCount> {
    Json(CartCount {
        count: app_state.cart_service.item_count(session.0),
    })
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    tag = "Cart",
    request_body = AddCartItemPayload,
    responses(
        (status = 200, description = "Produto adicionado (ou somado à linha igual)", body = Cart)
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Json(payload): Json<AddCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let cart = app_state
        .cart_service
        .add_item(session.0, payload.product, payload.quantity, payload.notes, payload.modifications)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{index}",
    tag = "Cart",
    request_body = UpdateQuantityPayload,
    responses(
        (status = 200, description = "Quantidade alterada; índice inexistente não altera nada", body = Cart)
    ),
    params(
        ("index" = usize, Path, description = "Posição da linha no carrinho"),
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn update_quantity(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(index): Path<usize>,
    Json(payload): Json<UpdateQuantityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state
        .cart_service
        .update_quantity(session.0, index, payload.quantity)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{index}",
    tag = "Cart",
    responses(
        (status = 200, description = "Linha removida", body = Cart)
    ),
    params(
        ("index" = usize, Path, description = "Posição da linha no carrinho"),
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state
        .cart_service
        .remove_item(session.0, index)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(cart))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    tag = "Cart",
    responses(
        (status = 204, description = "Carrinho esvaziado")
    ),
    params(
        ("x-session-id" = Uuid, Header, description = "ID da sessão do cliente")
    )
)]
pub async fn clear_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .cart_service
        .clear(session.0)
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
