// src/db/customer_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::loyalty::CustomerProfile};

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>, AppError>;

    // Usado pela sincronização em massa
    async fn list_all(&self) -> Result<Vec<CustomerProfile>, AppError>;

    /// Grava (ou limpa, com `None`) o ID do cliente no CRM externo.
    async fn set_crm_customer_id(
        &self,
        id: Uuid,
        crm_customer_id: Option<&str>,
    ) -> Result<(), AppError>;

    async fn update_loyalty(
        &self,
        id: Uuid,
        points: i64,
        tier: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>, AppError> {
        let customer = sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn list_all(&self) -> Result<Vec<CustomerProfile>, AppError> {
        let customers =
            sqlx::query_as::<_, CustomerProfile>("SELECT * FROM customers ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(customers)
    }

    async fn set_crm_customer_id(
        &self,
        id: Uuid,
        crm_customer_id: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE customers SET crm_customer_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(crm_customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CustomerNotFound);
        }
        Ok(())
    }

    async fn update_loyalty(
        &self,
        id: Uuid,
        points: i64,
        tier: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET points = $2, tier = $3, last_synced_at = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(points)
        .bind(tier)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CustomerNotFound);
        }
        Ok(())
    }
}
