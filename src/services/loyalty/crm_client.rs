// src/services/loyalty/crm_client.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::common::clock::Clock;

// Renova o token um pouco antes do vencimento declarado pelo CRM
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

// Erros de transporte do CRM. Não saem do módulo de fidelidade: o serviço
// troca qualquer um deles por um resultado seguro (zero pontos).
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Erro de rede: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CRM recusou as credenciais")]
    Unauthorized,

    #[error("CRM respondeu com status {0}")]
    Status(u16),

    #[error("Resposta inesperada do CRM: {0}")]
    InvalidResponse(String),
}

// =============================================================================
//  MODELO INTERNO (já normalizado)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrmCustomer {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomerQuery {
    Email(String),
    FullName { first_name: String, last_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointTransaction {
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointAccount {
    pub customer_id: Option<String>,
    pub program_id: Option<String>,
    pub balance: i64,
}

// Uma página de resultados. `total` só existe quando o CRM o declara.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
}

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// `Ok(None)` quando o CRM não conhece o ID.
    async fn customer_by_id(&self, id: &str) -> Result<Option<CrmCustomer>, CrmError>;

    async fn search_customers(&self, query: &CustomerQuery) -> Result<Vec<CrmCustomer>, CrmError>;

    // Páginas começam em 1
    async fn point_transactions(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointTransaction>, CrmError>;

    async fn point_accounts(
        &self,
        customer_id: &str,
        program_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointAccount>, CrmError>;
}

// =============================================================================
//  DTOs DA FRONTEIRA (nenhum campo é confiável)
// =============================================================================

// Aceita número, string numérica ou nada (vira 0)
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .unwrap_or(0),
        _ => 0,
    })
}

// IDs e telefones chegam ora como número, ora como string
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// O CRM devolve listas "cruas" em alguns endpoints e embrulhadas em outros
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        // Campos ausentes viram `None`
        #[serde(alias = "items", alias = "results")]
        data: Option<Vec<T>>,
        #[serde(alias = "count", alias = "totalCount")]
        total: Option<u64>,
    },
}

impl<T> Listing<T> {
    fn into_page(self) -> Page<T> {
        match self {
            Listing::Bare(items) => Page { items, total: None },
            Listing::Wrapped { data, total } => Page {
                items: data.unwrap_or_default(),
                total,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerDto {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, alias = "firstName", deserialize_with = "lenient_string")]
    first_name: Option<String>,
    #[serde(default, alias = "lastName", deserialize_with = "lenient_string")]
    last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    email: Option<String>,
    #[serde(
        default,
        alias = "phoneNumber",
        alias = "phone_number",
        deserialize_with = "lenient_string"
    )]
    phone: Option<String>,
}

impl CustomerDto {
    // Sem ID o registro não serve para nada
    fn normalize(self) -> Option<CrmCustomer> {
        Some(CrmCustomer {
            id: self.id?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PointTransactionDto {
    #[serde(default, alias = "points", deserialize_with = "lenient_i64")]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct PointAccountDto {
    #[serde(default, alias = "customerId", deserialize_with = "lenient_string")]
    customer_id: Option<String>,
    #[serde(
        default,
        alias = "programId",
        alias = "loyalty_program_id",
        deserialize_with = "lenient_string"
    )]
    program_id: Option<String>,
    #[serde(default, alias = "points", deserialize_with = "lenient_i64")]
    balance: i64,
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    #[serde(default, alias = "accessToken", alias = "token")]
    access_token: Option<String>,
    #[serde(default, alias = "expiresIn", deserialize_with = "lenient_i64")]
    expires_in: i64,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    api_key: &'a str,
}

// =============================================================================
//  CLIENTE HTTP
// =============================================================================

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct HttpCrmClient {
    client: Client,
    base_url: String,
    api_key: String,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<AccessToken>>,
}

impl HttpCrmClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CrmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            clock,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // Token válido do cache ou um novo trocado pela API key
    async fn access_token(&self) -> Result<String, CrmError> {
        let mut cached = self.token.lock().await;
        let now = self.clock.now_utc();

        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > now) {
            return Ok(token.value.clone());
        }

        tracing::debug!("🔑 Solicitando novo token de acesso ao CRM");
        let response = self
            .client
            .post(self.url("oauth/token"))
            .json(&TokenRequest { api_key: &self.api_key })
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(CrmError::Unauthorized),
            status if !status.is_success() => return Err(CrmError::Status(status.as_u16())),
            _ => {}
        }

        let dto: TokenDto = response.json().await?;
        let value = dto
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrmError::InvalidResponse("token ausente".into()))?;

        let ttl = if dto.expires_in > 0 { dto.expires_in } else { DEFAULT_TOKEN_TTL_SECS };
        let lifetime = (ttl - TOKEN_REFRESH_MARGIN_SECS).max(1);
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: now + chrono::Duration::seconds(lifetime),
        });

        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    /// GET autenticado. 404 vira `Ok(None)`; um 401 descarta o token e tenta
    /// de novo uma única vez.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, CrmError> {
        let url = self.url(path);

        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = self.client.get(&url).bearer_auth(&token).query(query).send().await?;

            match response.status() {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    tracing::debug!("🔑 Token do CRM rejeitado, renovando");
                    self.forget_token().await;
                }
                StatusCode::UNAUTHORIZED => return Err(CrmError::Unauthorized),
                StatusCode::NOT_FOUND => return Ok(None),
                status if !status.is_success() => return Err(CrmError::Status(status.as_u16())),
                _ => return Ok(Some(response.json::<T>().await?)),
            }
        }

        Err(CrmError::Unauthorized)
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Page<T>, CrmError> {
        Ok(self
            .get_json::<Listing<T>>(path, query)
            .await?
            .map(Listing::into_page)
            .unwrap_or(Page { items: Vec::new(), total: None }))
    }
}

#[async_trait]
impl CrmApi for HttpCrmClient {
    async fn customer_by_id(&self, id: &str) -> Result<Option<CrmCustomer>, CrmError> {
        let path = format!("customers/{}", urlencoding::encode(id));
        let dto: Option<CustomerDto> = self.get_json(&path, &[]).await?;
        Ok(dto.and_then(CustomerDto::normalize))
    }

    async fn search_customers(&self, query: &CustomerQuery) -> Result<Vec<CrmCustomer>, CrmError> {
        let params = match query {
            CustomerQuery::Email(email) => vec![("email", email.clone())],
            CustomerQuery::FullName { first_name, last_name } => vec![
                ("first_name", first_name.clone()),
                ("last_name", last_name.clone()),
            ],
        };

        let page: Page<CustomerDto> = self.get_listing("customers", &params).await?;
        Ok(page.items.into_iter().filter_map(CustomerDto::normalize).collect())
    }

    async fn point_transactions(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointTransaction>, CrmError> {
        let path = format!("customers/{}/point-transactions", urlencoding::encode(customer_id));
        let params = [("page", page.to_string()), ("limit", page_size.to_string())];

        let listing: Page<PointTransactionDto> = self.get_listing(&path, &params).await?;
        Ok(Page {
            items: listing
                .items
                .into_iter()
                .map(|dto| PointTransaction { amount: dto.amount })
                .collect(),
            total: listing.total,
        })
    }

    async fn point_accounts(
        &self,
        customer_id: &str,
        program_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointAccount>, CrmError> {
        let params = [
            ("page", page.to_string()),
            ("limit", page_size.to_string()),
            ("customer_id", customer_id.to_string()),
            ("program_id", program_id.to_string()),
        ];

        let listing: Page<PointAccountDto> = self.get_listing("point-accounts", &params).await?;
        Ok(Page {
            items: listing
                .items
                .into_iter()
                .map(|dto| PointAccount {
                    customer_id: dto.customer_id,
                    program_id: dto.program_id,
                    balance: dto.balance,
                })
                .collect(),
            total: listing.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_and_wrapped_listings_normalize_the_same() {
        let bare: Listing<PointTransactionDto> =
            serde_json::from_value(json!([{ "amount": 10 }, { "points": "5" }])).unwrap();
        let wrapped: Listing<PointTransactionDto> =
            serde_json::from_value(json!({ "data": [{ "amount": 10 }, { "amount": 5.0 }], "total": 2 }))
                .unwrap();

        let bare = bare.into_page();
        let wrapped = wrapped.into_page();
        assert_eq!(bare.items.iter().map(|t| t.amount).sum::<i64>(), 15);
        assert_eq!(wrapped.items.iter().map(|t| t.amount).sum::<i64>(), 15);
        assert_eq!(bare.total, None);
        assert_eq!(wrapped.total, Some(2));
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let dto: PointAccountDto =
            serde_json::from_value(json!({ "customerId": 42, "balance": null })).unwrap();
        assert_eq!(dto.customer_id.as_deref(), Some("42"));
        assert_eq!(dto.program_id, None);
        assert_eq!(dto.balance, 0);

        let tx: PointTransactionDto = serde_json::from_value(json!({ "amount": "abc" })).unwrap();
        assert_eq!(tx.amount, 0);
    }

    #[test]
    fn empty_wrapper_is_an_empty_page() {
        let listing: Listing<CustomerDto> = serde_json::from_value(json!({})).unwrap();
        assert!(listing.into_page().items.is_empty());
    }

    #[test]
    fn numeric_phones_do_not_break_the_listing() {
        let listing: Listing<CustomerDto> = serde_json::from_value(json!([
            { "id": "c-1", "firstName": "Mario", "lastName": "Rossi", "phone": 3331234567u64 },
            { "id": "c-2", "firstName": "Mario", "lastName": "Rossi", "phone": "06 555" }
        ]))
        .unwrap();

        let phones: Vec<Option<String>> = listing
            .into_page()
            .items
            .into_iter()
            .filter_map(CustomerDto::normalize)
            .map(|c| c.phone)
            .collect();
        assert_eq!(phones, vec![Some("3331234567".to_string()), Some("06 555".to_string())]);
    }

    #[test]
    fn customers_without_id_are_dropped() {
        let listing: Listing<CustomerDto> = serde_json::from_value(json!({
            "items": [
                { "id": "c-1", "firstName": "Mario", "lastName": "Rossi" },
                { "firstName": "Senza", "lastName": "Id" }
            ]
        }))
        .unwrap();

        let customers: Vec<CrmCustomer> = listing
            .into_page()
            .items
            .into_iter()
            .filter_map(CustomerDto::normalize)
            .collect();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].id, "c-1");
        assert_eq!(customers[0].last_name.as_deref(), Some("Rossi"));
    }
}

// Cliente HTTP de verdade contra um CRM falso servido pelo axum em 127.0.0.1:0
#[cfg(test)]
mod http_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        extract::{Path, State},
        http::StatusCode as HttpStatus,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::common::clock::FakeClock;

    #[derive(Clone, Default)]
    struct CrmState {
        token_requests: Arc<AtomicUsize>,
        // Quantos GETs ainda respondem 401
        rejections: Arc<AtomicUsize>,
    }

    impl CrmState {
        fn reject(&self) -> bool {
            self.rejections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn tokens_issued(&self) -> usize {
            self.token_requests.load(Ordering::SeqCst)
        }
    }

    async fn token(State(state): State<CrmState>) -> Json<Value> {
        let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
        Json(json!({ "accessToken": format!("tok-{n}"), "expiresIn": 120 }))
    }

    async fn search(State(state): State<CrmState>) -> Response {
        if state.reject() {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        Json(json!([
            { "id": "c-1", "firstName": "Mario", "lastName": "Rossi", "phone": 3331234567u64 },
            { "id": 77, "firstName": "Mario", "lastName": "Rossi", "phone": "06 555" }
        ]))
        .into_response()
    }

    async fn customer(State(state): State<CrmState>, Path(id): Path<String>) -> Response {
        if state.reject() {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        match id.as_str() {
            "c-1" => Json(json!({ "id": "c-1", "email": "mario@example.it", "phone": 3331234567u64 }))
                .into_response(),
            _ => HttpStatus::NOT_FOUND.into_response(),
        }
    }

    async fn transactions(State(state): State<CrmState>, Path(id): Path<String>) -> Response {
        if state.reject() {
            return HttpStatus::UNAUTHORIZED.into_response();
        }
        match id.as_str() {
            "c-1" => Json(json!({ "data": [{ "amount": 10 }, { "points": "5" }], "total": 2 }))
                .into_response(),
            _ => HttpStatus::NOT_FOUND.into_response(),
        }
    }

    async fn serve(state: CrmState) -> String {
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/customers", get(search))
            .route("/customers/{id}", get(customer))
            .route("/customers/{id}/point-transactions", get(transactions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve crm") });

        format!("http://{addr}/")
    }

    async fn client(state: &CrmState) -> (HttpCrmClient, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::at("2025-03-10T12:00:00+01:00"));
        let base_url = serve(state.clone()).await;
        let client = HttpCrmClient::new(base_url, "chiave", Duration::from_secs(5), clock.clone())
            .expect("cliente http");
        (client, clock)
    }

    #[tokio::test]
    async fn token_is_reused_until_it_expires() {
        let state = CrmState::default();
        let (crm, clock) = client(&state).await;

        assert!(crm.customer_by_id("c-1").await.unwrap().is_some());
        assert!(crm.customer_by_id("c-1").await.unwrap().is_some());
        assert_eq!(state.tokens_issued(), 1);

        // expiresIn 120 menos a margem de renovação
        clock.set("2025-03-10T12:01:29+01:00");
        crm.customer_by_id("c-1").await.unwrap();
        assert_eq!(state.tokens_issued(), 1);

        clock.set("2025-03-10T12:02:00+01:00");
        crm.customer_by_id("c-1").await.unwrap();
        assert_eq!(state.tokens_issued(), 2);
    }

    #[tokio::test]
    async fn rejected_token_is_renewed_once() {
        let state = CrmState::default();
        state.rejections.store(1, Ordering::SeqCst);
        let (crm, _) = client(&state).await;

        let found = crm.customer_by_id("c-1").await.unwrap().expect("cliente c-1");
        assert_eq!(found.phone.as_deref(), Some("3331234567"));
        assert_eq!(state.tokens_issued(), 2);
    }

    #[tokio::test]
    async fn second_rejection_gives_up() {
        let state = CrmState::default();
        state.rejections.store(5, Ordering::SeqCst);
        let (crm, _) = client(&state).await;

        let result = crm.customer_by_id("c-1").await;
        assert!(matches!(result, Err(CrmError::Unauthorized)));
        assert_eq!(state.tokens_issued(), 2);
    }

    #[tokio::test]
    async fn not_found_is_none_or_an_empty_page() {
        let state = CrmState::default();
        let (crm, _) = client(&state).await;

        assert_eq!(crm.customer_by_id("ghost").await.unwrap(), None);

        let page = crm.point_transactions("ghost", 1, 50).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, None);
    }

    #[tokio::test]
    async fn bare_and_wrapped_listings_over_http() {
        let state = CrmState::default();
        let (crm, _) = client(&state).await;

        let customers = crm
            .search_customers(&CustomerQuery::Email("mario@example.it".into()))
            .await
            .unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].phone.as_deref(), Some("3331234567"));
        assert_eq!(customers[1].id, "77");
        assert_eq!(customers[1].phone.as_deref(), Some("06 555"));

        let page = crm.point_transactions("c-1", 1, 50).await.unwrap();
        assert_eq!(page.items.iter().map(|t| t.amount).sum::<i64>(), 15);
        assert_eq!(page.total, Some(2));
    }
}
