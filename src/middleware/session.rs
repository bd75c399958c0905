// src/middleware/session.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// Cabeçalho com o ID da sessão do navegador (gerado pelo frontend)
pub const SESSION_ID_HEADER: &str = "x-session-id";

// Escopo do armazenamento local do cliente (carrinho, perfil, promoções)
#[derive(Debug, Clone, Copy)]
pub struct SessionContext(pub Uuid);

fn session_from(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from(parts).map(SessionContext).ok_or(AppError::MissingSession)
    }
}

// Sessão opcional (login do painel pode vir sem ela)
#[derive(Debug, Clone, Copy)]
pub struct MaybeSession(pub Option<Uuid>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(session_from(parts)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(value) = header {
            builder = builder.header(SESSION_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_header_becomes_the_session() {
        let id = Uuid::new_v4();
        let mut parts = parts(Some(&id.to_string()));
        let SessionContext(session) = SessionContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(session, id);
    }

    #[tokio::test]
    async fn missing_or_garbage_header_is_rejected() {
        let mut missing = parts(None);
        let mut garbage = parts(Some("../../etc"));

        assert!(matches!(
            SessionContext::from_request_parts(&mut missing, &()).await,
            Err(AppError::MissingSession)
        ));
        assert!(matches!(
            SessionContext::from_request_parts(&mut garbage, &()).await,
            Err(AppError::MissingSession)
        ));
        let MaybeSession(none) = MaybeSession::from_request_parts(&mut garbage, &()).await.unwrap();
        assert!(none.is_none());
    }
}
