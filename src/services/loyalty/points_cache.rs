// src/services/loyalty/points_cache.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::common::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct CachedPoints {
    points: i64,
    fetched_at: DateTime<Utc>,
}

/// Saldo de pontos por ID do CRM, com validade fixa.
pub struct PointsCache {
    entries: DashMap<String, CachedPoints>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PointsCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// `(pontos, buscado_em)` se a entrada ainda vale. Entrada vencida é removida.
    pub fn get(&self, crm_id: &str) -> Option<(i64, DateTime<Utc>)> {
        let now = self.clock.now_utc();
        let cached = *self.entries.get(crm_id)?;

        if now - cached.fetched_at < self.ttl {
            return Some((cached.points, cached.fetched_at));
        }

        self.entries.remove(crm_id);
        None
    }

    pub fn insert(&self, crm_id: &str, points: i64) -> DateTime<Utc> {
        let fetched_at = self.clock.now_utc();
        self.entries.insert(crm_id.to_string(), CachedPoints { points, fetched_at });
        fetched_at
    }

    pub fn invalidate(&self, crm_id: &str) -> bool {
        self.entries.remove(crm_id).is_some()
    }

    // Retorna quantas entradas foram descartadas
    pub fn flush(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
