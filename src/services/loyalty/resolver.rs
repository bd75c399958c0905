// src/services/loyalty/resolver.rs

use async_trait::async_trait;

use crate::{
    models::loyalty::LoyaltySubject,
    services::loyalty::crm_client::{CrmApi, CrmCustomer, CrmError, CustomerQuery},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(CrmCustomer),
    NotFound,
    // Quantidade de candidatos que sobraram
    Ambiguous(usize),
}

// Uma estratégia de busca no CRM. `NotFound` passa a vez para a próxima.
#[async_trait]
pub trait ResolverStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, crm: &dyn CrmApi, subject: &LoyaltySubject) -> Result<Resolution, CrmError>;
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn same_text(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.trim().eq_ignore_ascii_case(b.trim()))
}

/// Só dígitos, sem o prefixo internacional italiano (00 / +39).
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }
    if digits.len() > 10 {
        if let Some(rest) = digits.strip_prefix("39") {
            digits = rest.to_string();
        }
    }
    (!digits.is_empty()).then_some(digits)
}

// --- Estratégias ---

/// Busca por e-mail exato. Só adota quando há exatamente um resultado.
pub struct ByEmail;

#[async_trait]
impl ResolverStrategy for ByEmail {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn resolve(&self, crm: &dyn CrmApi, subject: &LoyaltySubject) -> Result<Resolution, CrmError> {
        let Some(email) = non_blank(subject.email.as_deref()) else {
            return Ok(Resolution::NotFound);
        };

        let mut matches: Vec<CrmCustomer> = crm
            .search_customers(&CustomerQuery::Email(email.to_string()))
            .await?
            .into_iter()
            .filter(|c| same_text(c.email.as_deref(), email))
            .collect();

        Ok(match matches.len() {
            1 => Resolution::Resolved(matches.remove(0)),
            // Vários com o mesmo e-mail: deixa o nome decidir
            _ => Resolution::NotFound,
        })
    }
}

/// Busca por nome + sobrenome; empate desfeito pelo telefone.
pub struct ByFullName;

#[async_trait]
impl ResolverStrategy for ByFullName {
    fn name(&self) -> &'static str {
        "full_name"
    }

    async fn resolve(&self, crm: &dyn CrmApi, subject: &LoyaltySubject) -> Result<Resolution, CrmError> {
        let (Some(first_name), Some(last_name)) = (
            non_blank(subject.first_name.as_deref()),
            non_blank(subject.last_name.as_deref()),
        ) else {
            return Ok(Resolution::NotFound);
        };

        let query = CustomerQuery::FullName {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let mut candidates: Vec<CrmCustomer> = crm
            .search_customers(&query)
            .await?
            .into_iter()
            .filter(|c| {
                same_text(c.first_name.as_deref(), first_name) && same_text(c.last_name.as_deref(), last_name)
            })
            .collect();

        match candidates.len() {
            0 => return Ok(Resolution::NotFound),
            1 => return Ok(Resolution::Resolved(candidates.remove(0))),
            _ => {}
        }

        let total = candidates.len();
        let Some(local_phone) = subject.phone.as_deref().and_then(normalize_phone) else {
            return Ok(Resolution::Ambiguous(total));
        };

        let mut by_phone: Vec<CrmCustomer> = candidates
            .into_iter()
            .filter(|c| c.phone.as_deref().and_then(normalize_phone).as_deref() == Some(local_phone.as_str()))
            .collect();

        Ok(match by_phone.len() {
            1 => Resolution::Resolved(by_phone.remove(0)),
            _ => Resolution::Ambiguous(total),
        })
    }
}

// =============================================================================
//  CADEIA
// =============================================================================

/// Estratégias em ordem; para na primeira resposta diferente de `NotFound`.
pub struct ResolverChain {
    strategies: Vec<Box<dyn ResolverStrategy>>,
}

impl ResolverChain {
    pub fn new(strategies: Vec<Box<dyn ResolverStrategy>>) -> Self {
        Self { strategies }
    }

    // e-mail -> nome + sobrenome (+ telefone)
    pub fn standard() -> Self {
        Self::new(vec![Box::new(ByEmail), Box::new(ByFullName)])
    }

    pub async fn resolve(&self, crm: &dyn CrmApi, subject: &LoyaltySubject) -> Result<Resolution, CrmError> {
        for strategy in &self.strategies {
            match strategy.resolve(crm, subject).await? {
                Resolution::NotFound => {
                    tracing::debug!("🔎 Estratégia '{}' sem resultado", strategy.name());
                }
                outcome => {
                    tracing::debug!("🔎 Estratégia '{}' decidiu: {:?}", strategy.name(), outcome);
                    return Ok(outcome);
                }
            }
        }
        Ok(Resolution::NotFound)
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::standard()
    }
}
