// src/db/coupon_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::coupon::{Coupon, CouponStatus},
};

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn insert(&self, coupon: &Coupon) -> Result<(), AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError>;

    /// Cupons gerados pelo cliente a partir de `since` (inclusive).
    async fn generated_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError>;

    /// Cupons do cliente resgatados a partir de `since` (inclusive).
    async fn redeemed_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError>;

    async fn mark_redeemed(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Coupon>, AppError>;
}

#[derive(Clone)]
pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CouponRow {
    id: Uuid,
    customer_id: Uuid,
    offer_id: String,
    code: String,
    status: String,
    created_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = AppError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Coupon {
            id: row.id,
            customer_id: row.customer_id,
            offer_id: row.offer_id,
            code: row.code,
            status: row.status.parse()?,
            created_at: row.created_at,
            redeemed_at: row.redeemed_at,
        })
    }
}

#[async_trait]
impl CouponStore for PgCouponRepository {
    async fn insert(&self, coupon: &Coupon) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO coupons (id, customer_id, offer_id, code, status, created_at, redeemed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(coupon.id)
        .bind(coupon.customer_id)
        .bind(&coupon.offer_id)
        .bind(&coupon.code)
        .bind(coupon.status.as_str())
        .bind(coupon.created_at)
        .bind(coupon.redeemed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn generated_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            "SELECT * FROM coupons WHERE customer_id = $1 AND created_at >= $2",
        )
        .bind(customer_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    async fn redeemed_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            r#"
            SELECT * FROM coupons
            WHERE customer_id = $1 AND status = $2 AND redeemed_at >= $3
            "#,
        )
        .bind(customer_id)
        .bind(CouponStatus::Redeemed.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    async fn mark_redeemed(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Coupon>, AppError> {
        sqlx::query_as::<_, CouponRow>(
            "UPDATE coupons SET status = $2, redeemed_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(CouponStatus::Redeemed.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .map(Coupon::try_from)
        .transpose()
    }
}
