// src/services/admin_auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{common::error::AppError, models::admin::AdminClaims};

pub const ADMIN_ROLE: &str = "admin";
const TOKEN_TTL_HOURS: i64 = 12;

// Painel com uma única senha compartilhada (hash bcrypt na configuração)
#[derive(Clone)]
pub struct AdminAuthService {
    password_hash: String,
    jwt_secret: String,
}

impl AdminAuthService {
    pub fn new(password_hash: String, jwt_secret: String) -> Self {
        Self { password_hash, jwt_secret }
    }

    pub async fn login(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let password_hash_clone = self.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!("🔒 Tentativa de login no painel com senha errada");
            return Err(AppError::InvalidCredentials);
        }

        self.create_token()
    }

    pub fn validate_token(&self, token: &str) -> Result<AdminClaims, AppError> {
        let token_data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        if token_data.claims.role != ADMIN_ROLE {
            return Err(AppError::InvalidToken);
        }
        Ok(token_data.claims)
    }

    fn create_token(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = AdminClaims {
            sub: ADMIN_ROLE.to_string(),
            role: ADMIN_ROLE.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
