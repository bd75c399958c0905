// src/models/cart.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::menu::{Modification, Product};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    // Cópia do produto no momento da adição
    pub product: Product,

    #[schema(example = 2, minimum = 1)]
    pub quantity: u32,

    #[schema(example = "Ben cotta")]
    pub notes: Option<String>,

    #[serde(default)]
    pub modifications: Vec<Modification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,

    // Sempre recalculado a partir dos itens (nunca somado incrementalmente)
    #[schema(value_type = f64, example = 14.0)]
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartCount {
    #[schema(example = 3)]
    pub count: u32,
}
