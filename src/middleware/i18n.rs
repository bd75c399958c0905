// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Idioma da loja quando o navegador não informa nada
pub const DEFAULT_LANG: &str = "it";

// Extrator de idioma (primeira tag do Accept-Language, sem região)
#[derive(Debug, Clone, PartialEq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .first()
            // "it-IT" -> "it"
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_language_without_region_wins() {
        assert_eq!(Locale::from_header("en-GB,en;q=0.9,it;q=0.8").0, "en");
        assert_eq!(Locale::from_header("it-IT").0, "it");
    }

    #[test]
    fn empty_header_falls_back_to_italian() {
        assert_eq!(Locale::from_header(""), Locale::default());
    }
}
