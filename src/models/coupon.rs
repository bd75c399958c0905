// src/models/coupon.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Redeemed,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponStatus::Active => "active",
            CouponStatus::Redeemed => "redeemed",
        }
    }
}

impl FromStr for CouponStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CouponStatus::Active),
            "redeemed" => Ok(CouponStatus::Redeemed),
            other => Err(anyhow::anyhow!("status de cupom desconhecido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[schema(example = "pizza-gratis-martedi")]
    pub offer_id: String,
    #[schema(example = "K7QX2M")]
    pub code: String,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateOfferPayload {
    pub customer_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "pizza-gratis-martedi")]
    pub offer_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedCoupon {
    #[schema(example = "K7QX2M")]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponPayload {
    #[validate(length(equal = 6, message = "invalid_code"))]
    #[schema(example = "K7QX2M")]
    pub code: String,
}

// Resultado do resgate no balcão
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    Redeemed { coupon: Coupon },
    NotFound,
    AlreadyUsed { redeemed_at: Option<DateTime<Utc>> },
    DailyLimitReached,
}
