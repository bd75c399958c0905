// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::clock::{Clock, SystemClock},
    db::{
        CouponStore, CustomerStore, FileKvStore, MemoryCouponStore, MemoryCustomerStore,
        MemoryOrderStore, OrderStore, PgCouponRepository, PgCustomerRepository, PgOrderRepository,
    },
    services::{
        admin_auth::AdminAuthService,
        cart_service::CartService,
        client_storage::ClientStorage,
        coupon_service::CouponService,
        loyalty::{
            crm_client::HttpCrmClient, points_cache::PointsCache, BulkSyncOptions, LoyaltyService,
            PointsSource,
        },
        order_service::OrderService,
    },
};

// =============================================================================
//  CONFIGURAÇÃO (variáveis de ambiente / .env)
// =============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    // Sem banco: stores em memória (modo demonstração)
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub storage_dir: PathBuf,
    pub whatsapp_number: String,
    pub shop_phone_number: String,
    pub crm_base_url: String,
    pub crm_api_key: String,
    pub crm_timeout: Duration,
    pub points_source: PointsSource,
    pub points_cache_ttl: chrono::Duration,
    pub bulk_sync: BulkSyncOptions,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", name, raw, e)),
        None => Ok(default),
    }
}

fn points_source(kind: Option<String>, program_id: Option<String>) -> anyhow::Result<PointsSource> {
    match kind.as_deref().unwrap_or("ledger") {
        "ledger" => Ok(PointsSource::Ledger),
        "balance" => {
            let program_id =
                program_id.context("LOYALTY_PROGRAM_ID é obrigatória quando LOYALTY_POINTS_SOURCE=balance")?;
            Ok(PointsSource::ProgramBalance { program_id })
        }
        other => anyhow::bail!("LOYALTY_POINTS_SOURCE desconhecida: {} (use ledger ou balance)", other),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_url: optional("DATABASE_URL"),
            jwt_secret: required("JWT_SECRET")?,
            admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
            storage_dir: optional("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/sessions")),
            whatsapp_number: required("WHATSAPP_NUMBER")?,
            shop_phone_number: required("SHOP_PHONE_NUMBER")?,
            crm_base_url: required("CRM_BASE_URL")?,
            crm_api_key: required("CRM_API_KEY")?,
            crm_timeout: Duration::from_secs(parsed("CRM_TIMEOUT_SECS", 10)?),
            points_source: points_source(optional("LOYALTY_POINTS_SOURCE"), optional("LOYALTY_PROGRAM_ID"))?,
            points_cache_ttl: chrono::Duration::seconds(parsed("LOYALTY_CACHE_TTL_SECS", 300)?),
            bulk_sync: BulkSyncOptions {
                batch_size: parsed("BULK_SYNC_BATCH_SIZE", 5)?,
                pause: Duration::from_millis(parsed("BULK_SYNC_PAUSE_MS", 250)?),
            },
        })
    }
}

// =============================================================================
//  ESTADO COMPARTILHADO
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub storage: ClientStorage,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub loyalty_service: LoyaltyService,
    pub coupon_service: CouponService,
    pub admin_auth: AdminAuthService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        // --- Stores ---
        let (db_pool, orders, customers, coupons): (
            Option<PgPool>,
            Arc<dyn OrderStore>,
            Arc<dyn CustomerStore>,
            Arc<dyn CouponStore>,
        ) = match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                (
                    Some(pool.clone()),
                    Arc::new(PgOrderRepository::new(pool.clone())),
                    Arc::new(PgCustomerRepository::new(pool.clone())),
                    Arc::new(PgCouponRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL ausente: usando stores em memória (dados somem ao reiniciar)");
                (
                    None,
                    Arc::new(MemoryOrderStore::new()),
                    Arc::new(MemoryCustomerStore::new()),
                    Arc::new(MemoryCouponStore::new()),
                )
            }
        };

        let kv = FileKvStore::new(&config.storage_dir)?;
        let storage = ClientStorage::new(Arc::new(kv));

        // --- CRM / fidelidade ---
        let crm = HttpCrmClient::new(
            config.crm_base_url.clone(),
            config.crm_api_key.clone(),
            config.crm_timeout,
            clock.clone(),
        )?;
        let cache = Arc::new(PointsCache::new(config.points_cache_ttl, clock.clone()));
        let loyalty_service = LoyaltyService::new(
            Arc::new(crm),
            customers,
            cache,
            config.points_source.clone(),
            clock.clone(),
        )
        .with_bulk_options(config.bulk_sync);

        // --- Monta o gráfico de dependências ---
        let order_service = OrderService::new(
            orders,
            clock.clone(),
            config.whatsapp_number.clone(),
            config.shop_phone_number.clone(),
        );

        Ok(Self {
            db_pool,
            cart_service: CartService::new(storage.clone()),
            storage,
            order_service,
            loyalty_service,
            coupon_service: CouponService::new(coupons, clock),
            admin_auth: AdminAuthService::new(config.admin_password_hash.clone(), config.jwt_secret.clone()),
        })
    }
}
