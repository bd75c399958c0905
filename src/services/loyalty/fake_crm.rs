// src/services/loyalty/fake_crm.rs
// CRM em memória para os testes do módulo de fidelidade

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::crm_client::{
    CrmApi, CrmCustomer, CrmError, CustomerQuery, Page, PointAccount, PointTransaction,
};

pub fn crm_customer(
    id: &str,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> CrmCustomer {
    CrmCustomer {
        id: id.to_string(),
        first_name: Some(first_name.to_string()),
        last_name: Some(last_name.to_string()),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
    }
}

fn paginate<T: Clone>(all: &[T], page: u32, page_size: u32) -> Page<T> {
    let start = (page.saturating_sub(1) as usize) * page_size as usize;
    let items = all.iter().skip(start).take(page_size as usize).cloned().collect();
    Page {
        items,
        total: Some(all.len() as u64),
    }
}

#[derive(Default)]
pub struct FakeCrm {
    customers: Vec<CrmCustomer>,
    ledger: HashMap<String, Vec<i64>>,
    accounts: Vec<PointAccount>,
    // IDs que fazem o CRM responder com erro
    failing_ids: Vec<String>,
    down: AtomicBool,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    ledger_calls: AtomicUsize,
}

impl FakeCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(mut self, customers: Vec<CrmCustomer>) -> Self {
        self.customers = customers;
        self
    }

    pub fn with_ledger(mut self, crm_id: &str, amounts: Vec<i64>) -> Self {
        self.ledger.insert(crm_id.to_string(), amounts);
        self
    }

    pub fn with_account(mut self, crm_id: &str, program_id: &str, balance: i64) -> Self {
        self.accounts.push(PointAccount {
            customer_id: Some(crm_id.to_string()),
            program_id: Some(program_id.to_string()),
            balance,
        });
        self
    }

    pub fn failing_for(mut self, crm_id: &str) -> Self {
        self.failing_ids.push(crm_id.to_string());
        self
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn ledger_calls(&self) -> usize {
        self.ledger_calls.load(Ordering::SeqCst)
    }

    fn check(&self, crm_id: Option<&str>) -> Result<(), CrmError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CrmError::Status(503));
        }
        if crm_id.is_some_and(|id| self.failing_ids.iter().any(|f| f == id)) {
            return Err(CrmError::Status(500));
        }
        Ok(())
    }
}

fn eq_ci(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}

#[async_trait]
impl CrmApi for FakeCrm {
    async fn customer_by_id(&self, id: &str) -> Result<Option<CrmCustomer>, CrmError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Some(id))?;
        Ok(self.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn search_customers(&self, query: &CustomerQuery) -> Result<Vec<CrmCustomer>, CrmError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check(None)?;

        let found = self
            .customers
            .iter()
            .filter(|c| match query {
                CustomerQuery::Email(email) => eq_ci(c.email.as_deref(), email),
                CustomerQuery::FullName { first_name, last_name } => {
                    eq_ci(c.first_name.as_deref(), first_name) && eq_ci(c.last_name.as_deref(), last_name)
                }
            })
            .cloned()
            .collect();
        Ok(found)
    }

    async fn point_transactions(
        &self,
        customer_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointTransaction>, CrmError> {
        self.ledger_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Some(customer_id))?;

        let rows: Vec<PointTransaction> = self
            .ledger
            .get(customer_id)
            .map(|amounts| amounts.iter().map(|&amount| PointTransaction { amount }).collect())
            .unwrap_or_default();
        Ok(paginate(&rows, page, page_size))
    }

    async fn point_accounts(
        &self,
        customer_id: &str,
        _program_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<PointAccount>, CrmError> {
        self.check(Some(customer_id))?;
        // Despejo completo, sem filtro (o serviço filtra)
        Ok(paginate(&self.accounts, page, page_size))
    }
}
