// src/models/profile.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::order::BuyerIdentity;

// Perfil do comprador salvo na sessão do cliente
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    // Presente quando o cliente já tem cadastro na pizzaria
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Mario")]
    pub first_name: String,

    #[schema(example = "Rossi")]
    pub last_name: Option<String>,

    #[validate(length(min = 5, message = "required"))]
    #[schema(example = "+39 333 1234567")]
    pub phone: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
}

impl BuyerProfile {
    pub fn identity(&self) -> BuyerIdentity {
        BuyerIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }
}
