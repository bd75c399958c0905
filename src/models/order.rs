// src/models/order.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Dono sintético dos pedidos feitos sem perfil salvo
pub const GUEST_OWNER_ID: &str = "guest";

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Transição de status feita pela equipe. Qualquer estado pode ir para
    /// qualquer outro (inclusive "para trás"): o painel permite corrigir
    /// erros de digitação, então nada é rejeitado aqui.
    pub fn transition_to(self, next: OrderStatus) -> OrderStatus {
        next
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(anyhow::anyhow!("status de pedido desconhecido: {}", other)),
        }
    }
}

// Canal por onde o pedido chegou
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Whatsapp,
    Phone,
    Web,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Whatsapp => "whatsapp",
            OrderSource::Phone => "phone",
            OrderSource::Web => "web",
        }
    }
}

impl FromStr for OrderSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(OrderSource::Whatsapp),
            "phone" => Ok(OrderSource::Phone),
            "web" => Ok(OrderSource::Web),
            other => Err(anyhow::anyhow!("origem de pedido desconhecida: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Fulfillment {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    DigitalWallet,
}

impl PaymentMethod {
    // Rótulo usado na mensagem enviada para a pizzaria
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Contanti",
            PaymentMethod::Card => "Carta",
            PaymentMethod::DigitalWallet => "Satispay / Wallet",
        }
    }
}

// --- Snapshots ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIdentity {
    #[schema(example = "Mario")]
    pub first_name: String,
    #[schema(example = "Rossi")]
    pub last_name: Option<String>,
    #[schema(example = "+39 333 1234567")]
    pub phone: String,
    pub email: Option<String>,
}

impl BuyerIdentity {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(last) => format!("{} {}", self.first_name.trim(), last),
            None => self.first_name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    #[schema(example = "Via Roma 12")]
    pub street: String,
    #[schema(example = "Milano")]
    pub city: String,
    // Nome no citofono
    #[schema(example = "Rossi")]
    pub doorbell: String,
    #[schema(example = "20:30")]
    pub requested_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModificationSnapshot {
    pub id: String,
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
}

// Linha congelada do pedido: nome e preço não mudam se o produto for editado
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    // Base + extras
    #[schema(value_type = f64, example = 7.0)]
    pub unit_price: Decimal,
    pub notes: Option<String>,
    #[serde(default)]
    pub modifications: Vec<ModificationSnapshot>,
}

// --- Pedido ---

// Pedido ainda sem ID (o ID é atribuído pelo store na gravação)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub owner_id: String,
    pub buyer: Option<BuyerIdentity>,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub source: OrderSource,
    pub fulfillment: Option<Fulfillment>,
    pub delivery: Option<DeliveryDetails>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "guest")]
    pub owner_id: String,
    pub buyer: Option<BuyerIdentity>,
    pub lines: Vec<OrderLine>,
    #[schema(value_type = f64, example = 14.0)]
    pub total: Decimal,
    pub status: OrderStatus,
    pub source: OrderSource,
    pub fulfillment: Option<Fulfillment>,
    pub delivery: Option<DeliveryDetails>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: Uuid, new: NewOrder) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            buyer: new.buyer,
            lines: new.lines,
            total: new.total,
            status: new.status,
            source: new.source,
            fulfillment: new.fulfillment,
            delivery: new.delivery,
            payment_method: new.payment_method,
            notes: new.notes,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }
}

// Filtros da listagem do painel (query string)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub owner_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.owner_id.as_deref().is_none_or(|owner| owner == order.owner_id)
            && self.status.is_none_or(|status| status == order.status)
            && self.created_from.is_none_or(|from| order.created_at >= from)
            && self.created_to.is_none_or(|to| order.created_at < to)
    }
}

// --- Checkout ---

// Dados do formulário de envio. Os campos do comprador só são usados quando
// a sessão não tem perfil salvo.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    pub fulfillment: Option<Fulfillment>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub doorbell: Option<String>,
    #[schema(example = "20:30")]
    pub requested_time: Option<String>,

    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

// Link externo que o cliente deve abrir (wa.me ou tel:)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub channel: OrderSource,
    #[schema(example = "https://wa.me/393331234567?text=...")]
    pub url: String,
}
