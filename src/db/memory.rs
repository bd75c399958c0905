// src/db/memory.rs

// Stores em memória. Usados quando o serviço sobe sem DATABASE_URL (modo
// demonstração) e nos testes. Os dados somem quando o processo termina.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CouponStore, CustomerStore, OrderStore},
    models::{
        coupon::{Coupon, CouponStatus},
        loyalty::CustomerProfile,
        order::{NewOrder, Order, OrderFilter, OrderStatus},
    },
};

// =============================================================================
//  PEDIDOS
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<Uuid, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, AppError> {
        let order = Order::from_new(Uuid::new_v4(), order);
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, AppError> {
        Ok(self.orders.get_mut(&id).map(|mut entry| {
            entry.status = status;
            entry.updated_at = updated_at;
            entry.clone()
        }))
    }
}

// =============================================================================
//  CLIENTES
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: DashMap<Uuid, CustomerProfile>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Carga inicial (modo demonstração / testes)
    pub fn with_customers(customers: impl IntoIterator<Item = CustomerProfile>) -> Self {
        let store = Self::new();
        for customer in customers {
            store.customers.insert(customer.id, customer);
        }
        store
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerProfile>, AppError> {
        Ok(self.customers.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<CustomerProfile>, AppError> {
        let mut customers: Vec<CustomerProfile> =
            self.customers.iter().map(|entry| entry.value().clone()).collect();
        customers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn set_crm_customer_id(
        &self,
        id: Uuid,
        crm_customer_id: Option<&str>,
    ) -> Result<(), AppError> {
        let mut entry = self.customers.get_mut(&id).ok_or(AppError::CustomerNotFound)?;
        entry.crm_customer_id = crm_customer_id.map(str::to_string);
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn update_loyalty(
        &self,
        id: Uuid,
        points: i64,
        tier: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut entry = self.customers.get_mut(&id).ok_or(AppError::CustomerNotFound)?;
        entry.points = points;
        entry.tier = Some(tier.to_string());
        entry.last_synced_at = Some(synced_at);
        entry.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
//  CUPONS
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCouponStore {
    coupons: DashMap<Uuid, Coupon>,
}

impl MemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponStore for MemoryCouponStore {
    async fn insert(&self, coupon: &Coupon) -> Result<(), AppError> {
        self.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        Ok(self
            .coupons
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.value().clone()))
    }

    async fn generated_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError> {
        Ok(self
            .coupons
            .iter()
            .filter(|entry| entry.customer_id == customer_id && entry.created_at >= since)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn redeemed_since(
        &self,
        customer_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, AppError> {
        Ok(self
            .coupons
            .iter()
            .filter(|entry| {
                entry.customer_id == customer_id
                    && entry.status == CouponStatus::Redeemed
                    && entry.redeemed_at.is_some_and(|at| at >= since)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn mark_redeemed(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Coupon>, AppError> {
        Ok(self.coupons.get_mut(&id).map(|mut entry| {
            entry.status = CouponStatus::Redeemed;
            entry.redeemed_at = Some(at);
            entry.clone()
        }))
    }
}
