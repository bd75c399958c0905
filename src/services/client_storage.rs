// src/services/client_storage.rs

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::KeyValueStore,
    models::{cart::Cart, profile::BuyerProfile},
    services::pricing,
};

// Chaves fixas da área de cada sessão
pub const CART_KEY: &str = "cart";
pub const BUYER_PROFILE_KEY: &str = "buyer_profile";
pub const ADMIN_SESSION_KEY: &str = "admin_session";
pub const SEEN_PROMOTIONS_KEY: &str = "seen_promotions";

// Acesso tipado ao armazenamento da sessão do cliente
#[derive(Clone)]
pub struct ClientStorage {
    store: Arc<dyn KeyValueStore>,
}

impl ClientStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, session: Uuid, key: &str) -> Result<Option<T>, AppError> {
        match self.store.get(&session.to_string(), key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, session: Uuid, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(&session.to_string(), key, &raw)
    }

    // Lê um valor "não crítico": se estiver corrompido, loga e segue sem ele
    fn read_lenient<T: DeserializeOwned>(&self, session: Uuid, key: &str) -> Option<T> {
        match self.read(session, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️ Valor '{}' da sessão {} ilegível, ignorando: {}", key, session, e);
                None
            }
        }
    }

    // --- Carrinho ---

    /// Carrinho salvo da sessão. Ausente ou corrompido vira carrinho vazio.
    pub fn load_cart(&self, session: Uuid) -> Cart {
        let Some(mut cart) = self.read_lenient::<Cart>(session, CART_KEY) else {
            return Cart::default();
        };
        // O total gravado não é confiável: recalcula a partir das linhas
        cart.items.retain(|item| item.quantity > 0);
        cart.total = pricing::cart_total(&cart.items);
        cart
    }

    pub fn save_cart(&self, session: Uuid, cart: &Cart) -> Result<(), AppError> {
        self.write(session, CART_KEY, cart)
    }

    pub fn clear_cart(&self, session: Uuid) -> Result<(), AppError> {
        self.store.remove(&session.to_string(), CART_KEY)
    }

    // --- Perfil do comprador ---

    pub fn buyer_profile(&self, session: Uuid) -> Option<BuyerProfile> {
        self.read_lenient(session, BUYER_PROFILE_KEY)
    }

    pub fn save_buyer_profile(&self, session: Uuid, profile: &BuyerProfile) -> Result<(), AppError> {
        self.write(session, BUYER_PROFILE_KEY, profile)
    }

    pub fn clear_buyer_profile(&self, session: Uuid) -> Result<(), AppError> {
        self.store.remove(&session.to_string(), BUYER_PROFILE_KEY)
    }

    // --- Sessão admin ---

    pub fn is_admin_session(&self, session: Uuid) -> bool {
        self.read_lenient::<bool>(session, ADMIN_SESSION_KEY).unwrap_or(false)
    }

    pub fn set_admin_session(&self, session: Uuid, active: bool) -> Result<(), AppError> {
        if active {
            self.write(session, ADMIN_SESSION_KEY, &true)
        } else {
            self.store.remove(&session.to_string(), ADMIN_SESSION_KEY)
        }
    }

    // --- Promoções já vistas ---

    pub fn seen_promotions(&self, session: Uuid) -> Vec<String> {
        self.read_lenient(session, SEEN_PROMOTIONS_KEY).unwrap_or_default()
    }

    pub fn mark_promotion_seen(&self, session: Uuid, promotion_id: &str) -> Result<Vec<String>, AppError> {
        let mut seen = self.seen_promotions(session);
        if !seen.iter().any(|id| id == promotion_id) {
            seen.push(promotion_id.to_string());
            self.write(session, SEEN_PROMOTIONS_KEY, &seen)?;
        }
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryKvStore,
        services::{cart_service, pricing::fixtures::*},
    };

    fn storage() -> (ClientStorage, Arc<MemoryKvStore>) {
        let kv = Arc::new(MemoryKvStore::new());
        (ClientStorage::new(kv.clone()), kv)
    }

    #[test]
    fn saved_cart_loads_back_equal() {
        let (storage, _) = storage();
        let session = Uuid::new_v4();
        let cart = cart_service::add_item(&Cart::default(), margherita(), 2, Some("Ben cotta".into()), vec![bufala()]);
        let cart = cart_service::add_item(&cart, margherita(), 1, None, vec![rucola()]);

        storage.save_cart(session, &cart).unwrap();
        assert_eq!(storage.load_cart(session), cart);
    }

    #[test]
    fn corrupted_cart_falls_back_to_empty() {
        let (storage, kv) = storage();
        let session = Uuid::new_v4();
        kv.set(&session.to_string(), CART_KEY, "{not json").unwrap();
        assert_eq!(storage.load_cart(session), Cart::default());
    }

    #[test]
    fn stored_total_is_recomputed_on_load() {
        let (storage, _) = storage();
        let session = Uuid::new_v4();
        let mut cart = cart_service::add_item(&Cart::default(), margherita(), 2, None, vec![]);
        cart.total = rust_decimal::Decimal::new(999, 0);
        storage.save_cart(session, &cart).unwrap();

        assert_eq!(storage.load_cart(session).total, rust_decimal::Decimal::new(1000, 2));
    }

    #[test]
    fn marking_a_promotion_twice_keeps_one_entry() {
        let (storage, _) = storage();
        let session = Uuid::new_v4();
        storage.mark_promotion_seen(session, "estate-2025").unwrap();
        let seen = storage.mark_promotion_seen(session, "estate-2025").unwrap();
        assert_eq!(seen, vec!["estate-2025".to_string()]);
    }

    #[test]
    fn admin_flag_can_be_cleared() {
        let (storage, _) = storage();
        let session = Uuid::new_v4();
        storage.set_admin_session(session, true).unwrap();
        assert!(storage.is_admin_session(session));
        storage.set_admin_session(session, false).unwrap();
        assert!(!storage.is_admin_session(session));
    }
}
