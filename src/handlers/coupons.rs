// src/handlers/coupons.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AdminSession, i18n::Locale},
    models::coupon::{ActivateOfferPayload, ActivatedCoupon, RedeemCouponPayload, RedemptionOutcome},
};

#[utoipa::path(
    post,
    path = "/api/coupons",
    tag = "Coupons",
    request_body = ActivateOfferPayload,
    responses(
        (status = 201, description = "Oferta ativada, código gerado", body = ActivatedCoupon),
        (status = 429, description = "Cliente já ativou uma oferta hoje")
    )
)]
pub async fn activate_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ActivateOfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let coupon = app_state
        .coupon_service
        .activate(payload.customer_id, &payload.offer_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(ActivatedCoupon { code: coupon.code })))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons/redeem",
    tag = "Admin",
    request_body = RedeemCouponPayload,
    responses(
        (status = 200, description = "Resultado do resgate: redeemed, not_found, already_used ou daily_limit_reached", body = RedemptionOutcome)
    ),
    security(("api_jwt" = []))
)]
pub async fn redeem(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Json(payload): Json<RedeemCouponPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let outcome = app_state
        .coupon_service
        .redeem(&payload.code)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(outcome))
}
