// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n, middleware::i18n::Locale};

// Erro de domínio da aplicação. Os handlers convertem para `ApiError`
// (já traduzido) com `to_api_error(&locale)`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Checkout ---
    #[error("Carrinho vazio")]
    EmptyCart,

    #[error("Nome e telefone do cliente são obrigatórios")]
    MissingBuyerIdentity,

    #[error("Campo de entrega obrigatório ausente: {0}")]
    MissingDeliveryField(&'static str),

    #[error("Sessão do cliente ausente ou inválida")]
    MissingSession,

    // --- Recursos ---
    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Cliente não encontrado")]
    CustomerNotFound,

    // --- Cupons ---
    #[error("Limite diário de cupons atingido")]
    CouponDailyLimit,

    // --- Admin ---
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // --- Infra ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de armazenamento local: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Resposta de erro já pronta para o cliente
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    // Código estável usado pelo frontend e pela tabela de traduções
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::EmptyCart => "empty_cart",
            AppError::MissingBuyerIdentity => "missing_buyer_identity",
            AppError::MissingDeliveryField(_) => "missing_delivery_field",
            AppError::MissingSession => "missing_session",
            AppError::OrderNotFound => "order_not_found",
            AppError::CustomerNotFound => "customer_not_found",
            AppError::CouponDailyLimit => "coupon_daily_limit",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            _ => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::EmptyCart
            | AppError::MissingBuyerIdentity
            | AppError::MissingDeliveryField(_)
            | AppError::MissingSession => StatusCode::BAD_REQUEST,
            AppError::OrderNotFound | AppError::CustomerNotFound => StatusCode::NOT_FOUND,
            AppError::CouponDailyLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe fica só no log, o cliente recebe a mensagem genérica
            tracing::error!("🔥 Erro Interno do Servidor: {}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            Value::String(i18n::translate(key, &locale.0))
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            AppError::MissingDeliveryField(field) => Some(json!({ "field": field })),
            _ => None,
        };

        ApiError {
            status,
            error: i18n::translate(self.code(), &locale.0),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_field_error_carries_field_name() {
        let api = AppError::MissingDeliveryField("city").to_api_error(&Locale("it".into()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details, Some(json!({ "field": "city" })));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exhausted"));
        let api = err.to_api_error(&Locale("en".into()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("pool"));
    }

    #[test]
    fn daily_limit_is_distinct_from_not_found() {
        assert_ne!(AppError::CouponDailyLimit.code(), AppError::CustomerNotFound.code());
        assert_eq!(AppError::CouponDailyLimit.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
