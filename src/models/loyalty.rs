// src/models/loyalty.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::profile::BuyerProfile;

// Cliente local (cadastro da pizzaria). O vínculo com o CRM externo fica em
// `crm_customer_id` e, uma vez resolvido, é reaproveitado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: Uuid,
    #[schema(example = "Mario")]
    pub first_name: Option<String>,
    #[schema(example = "Rossi")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub crm_customer_id: Option<String>,
    pub points: i64,
    pub tier: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Quem está sendo sincronizado. Pode vir do cadastro (com ID durável) ou do
// perfil salvo na sessão (que pode ainda não ter ID).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoyaltySubject {
    pub customer_id: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub crm_customer_id: Option<String>,
}

impl From<&CustomerProfile> for LoyaltySubject {
    fn from(profile: &CustomerProfile) -> Self {
        Self {
            customer_id: Some(profile.id),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            crm_customer_id: profile.crm_customer_id.clone(),
        }
    }
}

impl From<&BuyerProfile> for LoyaltySubject {
    fn from(profile: &BuyerProfile) -> Self {
        Self {
            customer_id: profile.customer_id,
            first_name: Some(profile.first_name.clone()),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: Some(profile.phone.clone()),
            crm_customer_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LoyaltyTier {
    Bronzo,
    Argento,
    Oro,
}

impl LoyaltyTier {
    pub fn for_points(points: i64) -> Self {
        match points {
            p if p >= 300 => LoyaltyTier::Oro,
            p if p >= 100 => LoyaltyTier::Argento,
            _ => LoyaltyTier::Bronzo,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoyaltyTier::Bronzo => "Bronzo",
            LoyaltyTier::Argento => "Argento",
            LoyaltyTier::Oro => "Oro",
        }
    }
}

// Resultado visível da sincronização
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    // Pontos buscados agora no CRM
    Synced,
    // Pontos servidos pelo cache
    Cached,
    NotFound,
    // Vários clientes no CRM com o mesmo nome e telefone não desempatou
    Ambiguous,
    // CRM fora do ar / erro de rede
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    pub customer_id: Option<Uuid>,
    pub crm_customer_id: Option<String>,
    #[schema(example = 120)]
    pub points: i64,
    pub tier: LoyaltyTier,
    pub status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkSyncFailure {
    pub customer_id: Uuid,
    pub reason: String,
}

// Relatório da sincronização em massa (painel admin)
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkSyncReport {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    pub failed: usize,
    pub failures: Vec<BulkSyncFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_point_thresholds() {
        assert_eq!(LoyaltyTier::for_points(0), LoyaltyTier::Bronzo);
        assert_eq!(LoyaltyTier::for_points(99), LoyaltyTier::Bronzo);
        assert_eq!(LoyaltyTier::for_points(100), LoyaltyTier::Argento);
        assert_eq!(LoyaltyTier::for_points(300), LoyaltyTier::Oro);
    }
}
