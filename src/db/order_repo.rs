// src/db/order_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::order::{
        BuyerIdentity, DeliveryDetails, Fulfillment, NewOrder, Order, OrderFilter, OrderLine,
        OrderStatus, PaymentMethod,
    },
};

// Contrato mínimo do store de pedidos: criar, ler por ID, listar com filtros
// simples e trocar status. Nada de joins ou transações.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: NewOrder) -> Result<Order, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError>;

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, AppError>;
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Linha crua da tabela `orders`. Snapshots ficam em JSONB, enums em TEXT.
#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    owner_id: String,
    buyer: Option<Json<BuyerIdentity>>,
    lines: Json<Vec<OrderLine>>,
    total: Decimal,
    status: String,
    source: String,
    fulfillment: Option<Json<Fulfillment>>,
    delivery: Option<Json<DeliveryDetails>>,
    payment_method: Option<Json<PaymentMethod>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            owner_id: row.owner_id,
            buyer: row.buyer.map(|b| b.0),
            lines: row.lines.0,
            total: row.total,
            status: row.status.parse()?,
            source: row.source.parse()?,
            fulfillment: row.fulfillment.map(|f| f.0),
            delivery: row.delivery.map(|d| d.0),
            payment_method: row.payment_method.map(|p| p.0),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, owner_id, buyer, lines, total, status, source, fulfillment, \
     delivery, payment_method, notes, created_at, updated_at";

#[async_trait]
impl OrderStore for PgOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, AppError> {
        let sql = format!(
            r#"
            INSERT INTO orders (
                id, owner_id, buyer, lines, total, status, source,
                fulfillment, delivery, payment_method, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&order.owner_id)
            .bind(order.buyer.as_ref().map(Json))
            .bind(Json(&order.lines))
            .bind(order.total)
            .bind(order.status.as_str())
            .bind(order.source.as_str())
            .bind(order.fulfillment.map(Json))
            .bind(order.delivery.as_ref().map(Json))
            .bind(order.payment_method.map(Json))
            .bind(order.notes.as_deref())
            .bind(order.created_at)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));

        if let Some(owner_id) = &filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.created_from {
            query.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            query.push(" AND created_at < ").push_bind(to);
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, AppError> {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );

        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }
}
