// src/services/order_service.rs

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::OrderStore,
    models::{
        cart::Cart,
        order::{
            BuyerIdentity, CheckoutRequest, DeliveryDetails, Dispatch, Fulfillment,
            ModificationSnapshot, NewOrder, Order, OrderFilter, OrderLine, OrderSource,
            OrderStatus, GUEST_OWNER_ID,
        },
        profile::BuyerProfile,
    },
    services::{order_message, pricing},
};

// Tempo máximo da gravação de auditoria antes de desistir
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
//  SUBMISSÃO
// =============================================================================

/// Resultado de um envio: o link externo (autoritativo) e o handle da
/// gravação em segundo plano. Quem chama pode ignorar o handle.
#[derive(Debug)]
pub struct Submission {
    pub dispatch: Dispatch,
    pub audit: AuditHandle,
}

// Gravação de auditoria em andamento. Nunca é juntada ao fluxo principal.
#[derive(Debug)]
pub struct AuditHandle(Option<JoinHandle<Option<Uuid>>>);

impl AuditHandle {
    fn none() -> Self {
        Self(None)
    }

    /// ID do pedido gravado, ou `None` se nada foi gravado (falha, timeout ou
    /// carrinho vazio). Usado nos testes e em logs.
    pub async fn outcome(self) -> Option<Uuid> {
        match self.0 {
            Some(handle) => handle.await.ok().flatten(),
            None => None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Congela nome e preço de cada linha no momento do pedido.
pub fn snapshot_lines(cart: &Cart) -> Vec<OrderLine> {
    cart.items
        .iter()
        .map(|item| OrderLine {
            product_id: item.product.id.clone(),
            name: item.product.name.clone(),
            quantity: item.quantity,
            unit_price: pricing::unit_price(item),
            notes: item.notes.clone(),
            modifications: item
                .modifications
                .iter()
                .map(|m| ModificationSnapshot {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    price: m.price,
                })
                .collect(),
        })
        .collect()
}

// Perfil salvo tem prioridade; sem perfil, os campos avulsos do formulário
// viram um comprador "guest".
fn resolve_buyer(
    profile: Option<&BuyerProfile>,
    request: &CheckoutRequest,
) -> Result<(String, BuyerIdentity), AppError> {
    if let Some(profile) = profile {
        let owner = profile
            .customer_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| GUEST_OWNER_ID.to_string());
        return Ok((owner, profile.identity()));
    }

    let (Some(first_name), Some(phone)) = (non_blank(&request.first_name), non_blank(&request.phone)) else {
        return Err(AppError::MissingBuyerIdentity);
    };

    let buyer = BuyerIdentity {
        first_name,
        last_name: non_blank(&request.last_name),
        phone,
        email: non_blank(&request.email),
    };
    Ok((GUEST_OWNER_ID.to_string(), buyer))
}

fn resolve_delivery(request: &CheckoutRequest) -> Result<DeliveryDetails, AppError> {
    let field = |value: &Option<String>, name: &'static str| {
        non_blank(value).ok_or(AppError::MissingDeliveryField(name))
    };

    Ok(DeliveryDetails {
        street: field(&request.street, "street")?,
        city: field(&request.city, "city")?,
        doorbell: field(&request.doorbell, "doorbell")?,
        requested_time: field(&request.requested_time, "requestedTime")?,
    })
}

/// Valida o checkout e monta o pedido. Sem efeitos colaterais.
pub fn prepare_order(
    cart: &Cart,
    profile: Option<&BuyerProfile>,
    request: &CheckoutRequest,
    source: OrderSource,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<NewOrder, AppError> {
    if cart.items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let (owner_id, buyer) = resolve_buyer(profile, request)?;

    // Sem escolha explícita o pedido é para retirada
    let fulfillment = request.fulfillment.unwrap_or(Fulfillment::Pickup);
    let delivery = match fulfillment {
        Fulfillment::Delivery => Some(resolve_delivery(request)?),
        Fulfillment::Pickup => None,
    };

    let lines = snapshot_lines(cart);
    Ok(NewOrder {
        owner_id,
        buyer: Some(buyer),
        total: pricing::cart_total(&cart.items),
        lines,
        status: OrderStatus::Pending,
        source,
        fulfillment: Some(fulfillment),
        delivery,
        payment_method: request.payment_method,
        notes: non_blank(&request.notes),
        created_at: now,
    })
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    whatsapp_number: String,
    shop_phone_number: String,
    persist_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        whatsapp_number: String,
        shop_phone_number: String,
    ) -> Self {
        Self {
            store,
            clock,
            whatsapp_number,
            shop_phone_number,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    // Gravação "melhor esforço": erro e timeout só vão para o log
    fn spawn_audit(&self, order: NewOrder) -> AuditHandle {
        let store = self.store.clone();
        let timeout = self.persist_timeout;

        AuditHandle(Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, store.insert(order)).await {
                Ok(Ok(saved)) => {
                    info!("📝 Pedido {} registrado (origem: {})", saved.id, saved.source.as_str());
                    Some(saved.id)
                }
                Ok(Err(e)) => {
                    warn!("⚠️ Falha ao registrar pedido (link já enviado): {}", e);
                    None
                }
                Err(_) => {
                    warn!("⚠️ Timeout ao registrar pedido após {:?} (link já enviado)", timeout);
                    None
                }
            }
        })))
    }

    /// Envio pelo WhatsApp. O link é montado antes de qualquer escrita e a
    /// gravação roda em segundo plano depois dele.
    pub fn submit_whatsapp(
        &self,
        cart: &Cart,
        profile: Option<&BuyerProfile>,
        request: &CheckoutRequest,
    ) -> Result<Submission, AppError> {
        let order = prepare_order(cart, profile, request, OrderSource::Whatsapp, self.clock.now_utc())?;

        let text = order_message::summary(&order);
        let dispatch = Dispatch {
            channel: OrderSource::Whatsapp,
            url: order_message::whatsapp_link(&self.whatsapp_number, &text),
        };

        let audit = self.spawn_audit(order);
        Ok(Submission { dispatch, audit })
    }

    /// Atalho de ligação. Nunca falha: o discador abre sempre e o carrinho,
    /// se houver, é gravado como metadado.
    pub fn call(&self, cart: &Cart, profile: Option<&BuyerProfile>) -> Submission {
        let dispatch = Dispatch {
            channel: OrderSource::Phone,
            url: order_message::phone_link(&self.shop_phone_number),
        };

        if cart.items.is_empty() {
            return Submission { dispatch, audit: AuditHandle::none() };
        }

        let owner_id = profile
            .and_then(|p| p.customer_id)
            .map(|id| id.to_string())
            .unwrap_or_else(|| GUEST_OWNER_ID.to_string());

        let order = NewOrder {
            owner_id,
            buyer: profile.map(BuyerProfile::identity),
            lines: snapshot_lines(cart),
            total: pricing::cart_total(&cart.items),
            status: OrderStatus::Pending,
            source: OrderSource::Phone,
            fulfillment: None,
            delivery: None,
            payment_method: None,
            notes: None,
            created_at: self.clock.now_utc(),
        };

        let audit = self.spawn_audit(order);
        Submission { dispatch, audit }
    }

    // --- Painel ---

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        self.store.list(filter).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.store.find_by_id(id).await?.ok_or(AppError::OrderNotFound)
    }

    pub async fn change_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, AppError> {
        let current = self.get_order(id).await?;

        if current.status.is_terminal() && !next.is_terminal() {
            warn!("↩️ Pedido {} reaberto: {} -> {}", id, current.status, next);
        }
        let status = current.status.transition_to(next);

        let updated = self
            .store
            .update_status(id, status, self.clock.now_utc())
            .await?
            .ok_or(AppError::OrderNotFound)?;

        info!("✅ Pedido {} agora está {}", id, updated.status);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        common::clock::FakeClock,
        db::MemoryOrderStore,
        models::order::PaymentMethod,
        services::{cart_service, pricing::fixtures::*},
    };

    // Store que sempre falha, para provar que o envio não depende dele
    struct BrokenStore;

    #[async_trait]
    impl OrderStore for BrokenStore {
        async fn insert(&self, _order: NewOrder) -> Result<Order, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("banco fora do ar")))
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Order>, AppError> {
            Ok(None)
        }
        async fn list(&self, _filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
            Ok(vec![])
        }
        async fn update_status(
            &self,
            _id: Uuid,
            _status: OrderStatus,
            _updated_at: DateTime<Utc>,
        ) -> Result<Option<Order>, AppError> {
            Ok(None)
        }
    }

    fn service(store: Arc<dyn OrderStore>) -> OrderService {
        OrderService::new(
            store,
            Arc::new(FakeClock::at("2025-03-10T20:00:00+01:00")),
            "+39 333 000 1111".into(),
            "+39 02 1234567".into(),
        )
    }

    fn cart() -> Cart {
        cart_service::add_item(&Cart::default(), margherita(), 2, None, vec![bufala()])
    }

    fn guest_request() -> CheckoutRequest {
        CheckoutRequest {
            first_name: Some("Mario".into()),
            phone: Some("+39 333 1234567".into()),
            payment_method: Some(PaymentMethod::Card),
            ..Default::default()
        }
    }

    fn profile(customer_id: Option<Uuid>) -> BuyerProfile {
        BuyerProfile {
            customer_id,
            first_name: "Lucia".into(),
            last_name: Some("Bianchi".into()),
            phone: "+39 347 7654321".into(),
            email: Some("lucia@example.com".into()),
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = prepare_order(&Cart::default(), None, &guest_request(), OrderSource::Whatsapp, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));
    }

    #[test]
    fn guest_without_phone_is_rejected() {
        let request = CheckoutRequest {
            first_name: Some("Mario".into()),
            phone: Some("   ".into()),
            ..Default::default()
        };
        let err = prepare_order(&cart(), None, &request, OrderSource::Whatsapp, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::MissingBuyerIdentity));
    }

    #[test]
    fn saved_profile_replaces_guest_fields() {
        let id = Uuid::new_v4();
        let order = prepare_order(
            &cart(),
            Some(&profile(Some(id))),
            &CheckoutRequest::default(),
            OrderSource::Whatsapp,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.owner_id, id.to_string());
        assert_eq!(order.buyer.unwrap().first_name, "Lucia");
    }

    #[test]
    fn guest_orders_use_the_sentinel_owner() {
        let order = prepare_order(&cart(), None, &guest_request(), OrderSource::Whatsapp, Utc::now()).unwrap();
        assert_eq!(order.owner_id, GUEST_OWNER_ID);
        assert_eq!(order.fulfillment, Some(Fulfillment::Pickup));
        assert!(order.delivery.is_none());
    }

    #[test]
    fn delivery_requires_every_address_field() {
        let mut request = guest_request();
        request.fulfillment = Some(Fulfillment::Delivery);
        request.street = Some("Via Roma 12".into());
        request.city = Some("Milano".into());
        request.doorbell = Some("Rossi".into());

        let err = prepare_order(&cart(), None, &request, OrderSource::Whatsapp, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::MissingDeliveryField("requestedTime")));

        request.requested_time = Some("20:30".into());
        let order = prepare_order(&cart(), None, &request, OrderSource::Whatsapp, Utc::now()).unwrap();
        assert_eq!(order.delivery.unwrap().city, "Milano");
    }

    #[test]
    fn snapshot_freezes_name_and_unit_price() {
        let mut cart = cart();
        let order = prepare_order(&cart, None, &guest_request(), OrderSource::Whatsapp, Utc::now()).unwrap();

        // Produto alterado depois do pedido
        cart.items[0].product.name = "Margherita DOP".into();
        cart.items[0].product.price = Decimal::new(900, 2);

        assert_eq!(order.lines[0].name, "Margherita");
        assert_eq!(order.lines[0].unit_price, Decimal::new(700, 2));
        assert_eq!(order.total, Decimal::new(1400, 2));
    }

    #[tokio::test]
    async fn whatsapp_submission_dispatches_then_persists() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service(store.clone());

        let submission = service.submit_whatsapp(&cart(), None, &guest_request()).unwrap();
        assert_eq!(submission.dispatch.channel, OrderSource::Whatsapp);
        assert!(submission.dispatch.url.starts_with("https://wa.me/393330001111?text="));

        let id = submission.audit.outcome().await.expect("pedido gravado");
        let saved = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved.source, OrderSource::Whatsapp);
        assert_eq!(saved.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_affect_dispatch() {
        let service = service(Arc::new(BrokenStore));

        let submission = service.submit_whatsapp(&cart(), None, &guest_request()).unwrap();
        assert!(submission.dispatch.url.contains("wa.me"));
        assert_eq!(submission.audit.outcome().await, None);
    }

    #[tokio::test]
    async fn call_never_fails_and_skips_empty_carts() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service(store.clone());

        let empty = service.call(&Cart::default(), None);
        assert_eq!(empty.dispatch.url, "tel:+39021234567");
        assert_eq!(empty.audit.outcome().await, None);

        let with_cart = service.call(&cart(), Some(&profile(None)));
        let id = with_cart.audit.outcome().await.expect("pedido gravado");
        let saved = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(saved.source, OrderSource::Phone);
        assert_eq!(saved.owner_id, GUEST_OWNER_ID);
    }

    #[tokio::test]
    async fn delivered_orders_can_be_reopened() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service(store.clone());
        let id = service
            .submit_whatsapp(&cart(), None, &guest_request())
            .unwrap()
            .audit
            .outcome()
            .await
            .unwrap();

        service.change_status(id, OrderStatus::Delivered).await.unwrap();
        let reopened = service.change_status(id, OrderStatus::Pending).await.unwrap();
        assert_eq!(reopened.status, OrderStatus::Pending);

        let missing = service.change_status(Uuid::new_v4(), OrderStatus::Ready).await;
        assert!(matches!(missing, Err(AppError::OrderNotFound)));
    }
}
