// src/models/menu.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// O cardápio é mantido pelo back office (fora deste serviço). Aqui só existem
// as cópias que o carrinho guarda no momento em que o item é adicionado.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Classiche,
    Speciali,
    Bianche,
    Calzoni,
    Bevande,
    Dolci,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[schema(example = "margherita")]
    pub id: String,

    #[schema(example = "Margherita")]
    pub name: String,

    #[serde(default)]
    #[schema(example = "Pomodoro, fiordilatte, basilico")]
    pub description: String,

    #[schema(value_type = f64, example = 5.0)]
    pub price: Decimal,

    pub category: ProductCategory,

    #[serde(default = "default_available")]
    pub available: bool,

    pub image_url: Option<String>,
}

// Ingredientes extras ("aggiunte")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ModificationCategory {
    Formaggi,
    Salumi,
    Verdure,
    Altro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    #[schema(example = "bufala")]
    pub id: String,

    #[schema(example = "Mozzarella di Bufala")]
    pub name: String,

    #[schema(value_type = f64, example = 2.0)]
    pub price: Decimal,

    pub category: ModificationCategory,

    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}
