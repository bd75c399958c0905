// src/services/loyalty.rs

pub mod crm_client;
pub mod points_cache;
pub mod resolver;

#[cfg(test)]
pub mod fake_crm;

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::CustomerStore,
    models::loyalty::{
        BulkSyncFailure, BulkSyncReport, LoyaltyAccount, LoyaltySubject, LoyaltyTier, SyncStatus,
    },
};

use self::{
    crm_client::{CrmApi, CrmError},
    points_cache::PointsCache,
    resolver::{Resolution, ResolverChain},
};

pub const LEDGER_PAGE_SIZE: u32 = 50;
// Teto de segurança contra um CRM que nunca devolve página curta
pub const MAX_PAGES: u32 = 200;

/// De onde vem o saldo de pontos de um cliente resolvido.
#[derive(Debug, Clone, PartialEq)]
pub enum PointsSource {
    // Soma do campo `amount` do extrato paginado
    Ledger,
    // Saldo da conta do cliente num programa específico
    ProgramBalance { program_id: String },
}

#[derive(Debug, Clone, Copy)]
pub struct BulkSyncOptions {
    // Pausa a cada `batch_size` clientes
    pub batch_size: usize,
    pub pause: Duration,
}

impl Default for BulkSyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            pause: Duration::from_millis(250),
        }
    }
}

// Resultado da etapa de vínculo local -> CRM
enum Link {
    Linked(String),
    NotFound,
    Ambiguous,
}

#[derive(Clone)]
pub struct LoyaltyService {
    crm: Arc<dyn CrmApi>,
    customers: Arc<dyn CustomerStore>,
    resolver: Arc<ResolverChain>,
    cache: Arc<PointsCache>,
    source: PointsSource,
    clock: Arc<dyn Clock>,
    bulk: BulkSyncOptions,
}

impl LoyaltyService {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        customers: Arc<dyn CustomerStore>,
        cache: Arc<PointsCache>,
        source: PointsSource,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crm,
            customers,
            resolver: Arc::new(ResolverChain::standard()),
            cache,
            source,
            clock,
            bulk: BulkSyncOptions::default(),
        }
    }

    pub fn with_bulk_options(mut self, bulk: BulkSyncOptions) -> Self {
        self.bulk = bulk;
        self
    }

    fn account(
        &self,
        subject: &LoyaltySubject,
        crm_customer_id: Option<String>,
        points: i64,
        status: SyncStatus,
        last_synced_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> LoyaltyAccount {
        LoyaltyAccount {
            customer_id: subject.customer_id,
            crm_customer_id,
            points,
            tier: LoyaltyTier::for_points(points),
            status,
            last_synced_at,
        }
    }

    // =========================================================================
    //  VÍNCULO
    // =========================================================================

    // Grava o ID do CRM no cadastro. Falha aqui não interrompe a sincronização.
    async fn remember_link(&self, subject: &LoyaltySubject, crm_id: Option<&str>) {
        let Some(customer_id) = subject.customer_id else {
            tracing::debug!("Perfil sem ID durável, vínculo com o CRM não foi gravado");
            return;
        };

        if let Err(e) = self.customers.set_crm_customer_id(customer_id, crm_id).await {
            warn!("⚠️ Não foi possível gravar o vínculo CRM do cliente {}: {}", customer_id, e);
        }
    }

    async fn link(&self, subject: &LoyaltySubject, force_refresh: bool) -> Result<Link, CrmError> {
        if let Some(cached_id) = subject.crm_customer_id.as_deref() {
            // Pontos ainda no cache: nenhuma chamada de rede
            if !force_refresh && self.cache.get(cached_id).is_some() {
                return Ok(Link::Linked(cached_id.to_string()));
            }

            if self.crm.customer_by_id(cached_id).await?.is_some() {
                return Ok(Link::Linked(cached_id.to_string()));
            }

            warn!("🔗 Cliente {} não existe mais no CRM, refazendo a busca", cached_id);
            self.cache.invalidate(cached_id);
            self.remember_link(subject, None).await;
        }

        match self.resolver.resolve(self.crm.as_ref(), subject).await? {
            Resolution::Resolved(customer) => {
                info!("🔗 Cliente local vinculado ao CRM ({})", customer.id);
                self.remember_link(subject, Some(&customer.id)).await;
                Ok(Link::Linked(customer.id))
            }
            Resolution::NotFound => Ok(Link::NotFound),
            Resolution::Ambiguous(candidates) => {
                warn!("⚠️ {} candidatos no CRM para o mesmo cliente, nenhum escolhido", candidates);
                Ok(Link::Ambiguous)
            }
        }
    }

    // =========================================================================
    //  PONTOS
    // =========================================================================

    async fn ledger_points(&self, crm_id: &str) -> Result<i64, CrmError> {
        let mut total = 0_i64;
        let mut seen = 0_u64;

        for page in 1..=MAX_PAGES {
            let rows = self.crm.point_transactions(crm_id, page, LEDGER_PAGE_SIZE).await?;
            let count = rows.items.len();

            // Valores do CRM não são confiáveis: estouro vira resposta inválida
            total = rows
                .items
                .iter()
                .try_fold(total, |acc, t| acc.checked_add(t.amount))
                .ok_or_else(|| {
                    CrmError::InvalidResponse(format!("soma do extrato de {} estourou", crm_id))
                })?;
            seen += count as u64;

            let short_page = count < LEDGER_PAGE_SIZE as usize;
            let reached_total = rows.total.is_some_and(|declared| seen >= declared);
            if short_page || reached_total {
                return Ok(total);
            }
        }

        warn!("⚠️ Extrato do cliente {} passou de {} páginas, soma parcial", crm_id, MAX_PAGES);
        Ok(total)
    }

    async fn program_balance(&self, crm_id: &str, program_id: &str) -> Result<i64, CrmError> {
        for page in 1..=MAX_PAGES {
            let accounts = self.crm.point_accounts(crm_id, program_id, page, LEDGER_PAGE_SIZE).await?;

            let found = accounts.items.iter().find(|a| {
                a.customer_id.as_deref() == Some(crm_id) && a.program_id.as_deref() == Some(program_id)
            });
            if let Some(account) = found {
                return Ok(account.balance);
            }

            if accounts.items.len() < LEDGER_PAGE_SIZE as usize {
                break;
            }
        }

        // Sem conta no programa = sem pontos
        Ok(0)
    }

    async fn fetch_points(&self, crm_id: &str) -> Result<i64, CrmError> {
        match &self.source {
            PointsSource::Ledger => self.ledger_points(crm_id).await,
            PointsSource::ProgramBalance { program_id } => self.program_balance(crm_id, program_id).await,
        }
    }

    // =========================================================================
    //  API DO SERVIÇO
    // =========================================================================

    /// Vínculo + pontos. Erros do CRM sobem para quem chamou decidir.
    pub async fn try_sync(
        &self,
        subject: &LoyaltySubject,
        force_refresh: bool,
    ) -> Result<LoyaltyAccount, CrmError> {
        let crm_id = match self.link(subject, force_refresh).await? {
            Link::Linked(id) => id,
            Link::NotFound => return Ok(self.account(subject, None, 0, SyncStatus::NotFound, None)),
            Link::Ambiguous => return Ok(self.account(subject, None, 0, SyncStatus::Ambiguous, None)),
        };

        if !force_refresh {
            if let Some((points, fetched_at)) = self.cache.get(&crm_id) {
                return Ok(self.account(subject, Some(crm_id), points, SyncStatus::Cached, Some(fetched_at)));
            }
        }

        let points = self.fetch_points(&crm_id).await?;
        let fetched_at = self.cache.insert(&crm_id, points);
        Ok(self.account(subject, Some(crm_id), points, SyncStatus::Synced, Some(fetched_at)))
    }

    /// Versão que nunca falha: CRM indisponível vira zero pontos.
    pub async fn sync(&self, subject: &LoyaltySubject) -> LoyaltyAccount {
        match self.try_sync(subject, false).await {
            Ok(account) => account,
            Err(e) => {
                warn!("⚠️ CRM indisponível, exibindo 0 pontos: {}", e);
                self.account(subject, subject.crm_customer_id.clone(), 0, SyncStatus::Unavailable, None)
            }
        }
    }

    pub async fn account_for_customer(&self, customer_id: Uuid) -> Result<LoyaltyAccount, AppError> {
        let customer = self
            .customers
            .find_by_id(customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        Ok(self.sync(&LoyaltySubject::from(&customer)).await)
    }

    /// Sincroniza todos os clientes, um por vez. Falha de um cliente entra no
    /// relatório e o lote continua. O saldo é sempre recalculado a partir do
    /// CRM, então rodar duas vezes dá o mesmo resultado.
    pub async fn sync_all(&self) -> Result<BulkSyncReport, AppError> {
        let customers = self.customers.list_all().await?;
        let mut report = BulkSyncReport::default();
        info!("🔄 Sincronização de fidelidade iniciada ({} clientes)", customers.len());

        for (index, customer) in customers.iter().enumerate() {
            if index > 0 && self.bulk.batch_size > 0 && index % self.bulk.batch_size == 0 {
                tokio::time::sleep(self.bulk.pause).await;
            }
            report.processed += 1;

            let account = match self.try_sync(&LoyaltySubject::from(customer), true).await {
                Ok(account) => account,
                Err(e) => {
                    warn!("⚠️ Cliente {} não sincronizado: {}", customer.id, e);
                    report.failed += 1;
                    report.failures.push(BulkSyncFailure {
                        customer_id: customer.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match account.status {
                SyncStatus::NotFound => report.not_found += 1,
                SyncStatus::Ambiguous => report.ambiguous += 1,
                _ => {
                    let tier = account.tier.label();
                    let changed =
                        account.points != customer.points || customer.tier.as_deref() != Some(tier);
                    if !changed {
                        report.unchanged += 1;
                        continue;
                    }

                    match self
                        .customers
                        .update_loyalty(customer.id, account.points, tier, self.clock.now_utc())
                        .await
                    {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!("⚠️ Saldo do cliente {} não gravado: {}", customer.id, e);
                            report.failed += 1;
                            report.failures.push(BulkSyncFailure {
                                customer_id: customer.id,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            "✅ Sincronização concluída: {} atualizados, {} iguais, {} sem cadastro, {} ambíguos, {} falhas",
            report.updated, report.unchanged, report.not_found, report.ambiguous, report.failed
        );
        Ok(report)
    }

    /// Desfaz o vínculo com o CRM (a próxima consulta refaz a busca).
    pub async fn unlink(&self, customer_id: Uuid) -> Result<(), AppError> {
        let customer = self
            .customers
            .find_by_id(customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        if let Some(crm_id) = customer.crm_customer_id.as_deref() {
            self.cache.invalidate(crm_id);
        }
        self.customers.set_crm_customer_id(customer_id, None).await
    }

    pub fn invalidate_points(&self, crm_id: &str) -> bool {
        self.cache.invalidate(crm_id)
    }

    pub fn flush_points_cache(&self) -> usize {
        self.cache.flush()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{
        common::clock::FakeClock,
        db::MemoryCustomerStore,
        models::loyalty::CustomerProfile,
    };
    use super::fake_crm::{crm_customer, FakeCrm};

    fn customer(first: &str, last: &str, email: Option<&str>, phone: Option<&str>) -> CustomerProfile {
        let created_at: DateTime<Utc> = Utc::now();
        CustomerProfile {
            id: Uuid::new_v4(),
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            crm_customer_id: None,
            points: 0,
            tier: None,
            last_synced_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    struct Harness {
        crm: Arc<FakeCrm>,
        customers: Arc<MemoryCustomerStore>,
        clock: Arc<FakeClock>,
        service: LoyaltyService,
    }

    fn harness(crm: FakeCrm, customers: Vec<CustomerProfile>, source: PointsSource) -> Harness {
        let crm = Arc::new(crm);
        let customers = Arc::new(MemoryCustomerStore::with_customers(customers));
        let clock = Arc::new(FakeClock::at("2025-03-10T12:00:00+01:00"));
        let cache = Arc::new(PointsCache::new(chrono::Duration::minutes(5), clock.clone()));

        let service = LoyaltyService::new(crm.clone(), customers.clone(), cache, source, clock.clone())
            .with_bulk_options(BulkSyncOptions {
                batch_size: 2,
                pause: Duration::from_millis(1),
            });

        Harness { crm, customers, clock, service }
    }

    #[tokio::test]
    async fn email_resolution_is_persisted_and_used_for_points() {
        let mario = customer("Mario", "Rossi", Some("mario@example.com"), None);
        let id = mario.id;
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", Some("mario@example.com"), None)])
            .with_ledger("c-1", vec![40, 30, 50]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);

        let account = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(account.status, SyncStatus::Synced);
        assert_eq!(account.crm_customer_id.as_deref(), Some("c-1"));
        assert_eq!(account.points, 120);
        assert_eq!(account.tier, LoyaltyTier::Argento);
        assert_eq!(h.crm.search_calls(), 1);

        let stored = h.customers.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.crm_customer_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn cached_link_skips_searching() {
        let mut mario = customer("Mario", "Rossi", Some("mario@example.com"), None);
        mario.crm_customer_id = Some("c-1".into());
        let id = mario.id;
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", None, None)])
            .with_ledger("c-1", vec![10]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);

        let first = h.service.account_for_customer(id).await.unwrap();
        let second = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(first.status, SyncStatus::Synced);
        assert_eq!(second.status, SyncStatus::Cached);
        assert_eq!(second.points, 10);
        assert_eq!(h.crm.search_calls(), 0);
        assert_eq!(h.crm.ledger_calls(), 1);
        assert_eq!(h.crm.lookup_calls(), 1);
    }

    #[tokio::test]
    async fn cache_expiry_triggers_a_new_fetch() {
        let mut mario = customer("Mario", "Rossi", None, None);
        mario.crm_customer_id = Some("c-1".into());
        let id = mario.id;
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", None, None)])
            .with_ledger("c-1", vec![10]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);

        h.service.account_for_customer(id).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(6));
        let again = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(again.status, SyncStatus::Synced);
        assert_eq!(h.crm.ledger_calls(), 2);
    }

    #[tokio::test]
    async fn stale_link_is_dropped_and_resolved_again() {
        let mut mario = customer("Mario", "Rossi", Some("mario@example.com"), None);
        mario.crm_customer_id = Some("c-old".into());
        let id = mario.id;
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-new", "Mario", "Rossi", Some("mario@example.com"), None)])
            .with_ledger("c-new", vec![5]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);

        let account = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(account.crm_customer_id.as_deref(), Some("c-new"));
        let stored = h.customers.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.crm_customer_id.as_deref(), Some("c-new"));
    }

    #[tokio::test]
    async fn ambiguous_name_is_reported_without_points() {
        let mario = customer("Mario", "Rossi", None, Some("+39 333 1234567"));
        let id = mario.id;
        let crm = FakeCrm::new().with_customers(vec![
            crm_customer("c-1", "Mario", "Rossi", None, Some("02 555 0000")),
            crm_customer("c-2", "Mario", "Rossi", None, None),
        ]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);

        let account = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(account.status, SyncStatus::Ambiguous);
        assert_eq!(account.crm_customer_id, None);
        assert_eq!(account.points, 0);
        let stored = h.customers.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.crm_customer_id, None);
    }

    #[tokio::test]
    async fn upstream_failure_means_zero_points() {
        let mario = customer("Mario", "Rossi", Some("mario@example.com"), None);
        let id = mario.id;
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", Some("mario@example.com"), None)])
            .with_ledger("c-1", vec![100]);
        let h = harness(crm, vec![mario], PointsSource::Ledger);
        h.crm.set_down(true);

        let account = h.service.account_for_customer(id).await.unwrap();

        assert_eq!(account.status, SyncStatus::Unavailable);
        assert_eq!(account.points, 0);
        assert_eq!(h.service.flush_points_cache(), 0);
    }

    #[tokio::test]
    async fn overflowing_ledger_means_zero_points() {
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", Some("m@example.com"), None)])
            .with_ledger("c-1", vec![i64::MAX, 1]);
        let h = harness(crm, vec![], PointsSource::Ledger);
        let subject = LoyaltySubject {
            email: Some("m@example.com".into()),
            ..Default::default()
        };

        let account = h.service.sync(&subject).await;

        assert_eq!(account.status, SyncStatus::Unavailable);
        assert_eq!(account.points, 0);
        assert_eq!(h.service.flush_points_cache(), 0);
    }

    #[tokio::test]
    async fn ledger_is_summed_across_pages() {
        let amounts: Vec<i64> = (0..120).map(|_| 1).collect();
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", Some("m@example.com"), None)])
            .with_ledger("c-1", amounts);
        let h = harness(crm, vec![], PointsSource::Ledger);
        let subject = LoyaltySubject {
            email: Some("m@example.com".into()),
            ..Default::default()
        };

        let account = h.service.sync(&subject).await;

        assert_eq!(account.points, 120);
        // 50 + 50 + 20
        assert_eq!(h.crm.ledger_calls(), 3);
    }

    #[tokio::test]
    async fn program_balance_reads_the_matching_account() {
        let crm = FakeCrm::new()
            .with_customers(vec![crm_customer("c-1", "Mario", "Rossi", Some("m@example.com"), None)])
            .with_account("c-9", "fedelta", 999)
            .with_account("c-1", "altro", 50)
            .with_account("c-1", "fedelta", 320);
        let source = PointsSource::ProgramBalance { program_id: "fedelta".into() };
        let h = harness(crm, vec![], source);
        let subject = LoyaltySubject {
            email: Some("m@example.com".into()),
            ..Default::default()
        };

        let account = h.service.sync(&subject).await;
        assert_eq!(account.points, 320);
        assert_eq!(account.tier, LoyaltyTier::Oro);
    }

    #[tokio::test]
    async fn bulk_sync_continues_past_failures_and_is_idempotent() {
        let anna = customer("Anna", "Verdi", Some("anna@example.com"), None);
        let bruno = customer("Bruno", "Neri", Some("bruno@example.com"), None);
        let carla = customer("Carla", "Blu", Some("carla@example.com"), None);
        let ghost = customer("Nessuno", "Mai", None, None);
        let (anna_id, carla_id) = (anna.id, carla.id);

        let crm = FakeCrm::new()
            .with_customers(vec![
                crm_customer("c-a", "Anna", "Verdi", Some("anna@example.com"), None),
                crm_customer("c-b", "Bruno", "Neri", Some("bruno@example.com"), None),
                crm_customer("c-c", "Carla", "Blu", Some("carla@example.com"), None),
            ])
            .with_ledger("c-a", vec![60, 60])
            .with_ledger("c-c", vec![10])
            .failing_for("c-b");
        let h = harness(crm, vec![anna, bruno, carla, ghost], PointsSource::Ledger);

        let first = h.service.sync_all().await.unwrap();
        assert_eq!(first.processed, 4);
        assert_eq!(first.updated, 2);
        assert_eq!(first.not_found, 1);
        assert_eq!(first.failed, 1);
        assert_eq!(first.failures.len(), 1);

        let second = h.service.sync_all().await.unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 2);

        let anna = h.customers.find_by_id(anna_id).await.unwrap().unwrap();
        assert_eq!(anna.points, 120);
        assert_eq!(anna.tier.as_deref(), Some("Argento"));
        let carla = h.customers.find_by_id(carla_id).await.unwrap().unwrap();
        assert_eq!(carla.points, 10);
    }

    #[tokio::test]
    async fn unlink_forgets_the_crm_id() {
        let mut mario = customer("Mario", "Rossi", None, None);
        mario.crm_customer_id = Some("c-1".into());
        let id = mario.id;
        let h = harness(FakeCrm::new(), vec![mario], PointsSource::Ledger);

        h.service.unlink(id).await.unwrap();

        let stored = h.customers.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.crm_customer_id, None);
        assert!(matches!(h.service.unlink(Uuid::new_v4()).await, Err(AppError::CustomerNotFound)));
    }
}
