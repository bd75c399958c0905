// src/services/coupon_service.rs

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::CouponStore,
    models::coupon::{Coupon, CouponStatus, RedemptionOutcome},
};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 5;

// 6 caracteres, A-Z e 0-9
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl CouponService {
    pub fn new(store: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // Código que ainda não existe no store
    async fn unused_code(&self) -> Result<String, AppError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code();
            if self.store.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
            warn!("🎟️ Colisão de código de cupom ({}), gerando outro", code);
        }
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "nenhum código de cupom livre após {} tentativas",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// Ativa uma oferta: no máximo um cupom gerado por cliente por dia
    /// (meia-noite local). Verificação e gravação não são atômicas.
    pub async fn activate(&self, customer_id: Uuid, offer_id: &str) -> Result<Coupon, AppError> {
        let today = self.clock.start_of_today();
        if !self.store.generated_since(customer_id, today).await?.is_empty() {
            return Err(AppError::CouponDailyLimit);
        }

        let coupon = Coupon {
            id: Uuid::new_v4(),
            customer_id,
            offer_id: offer_id.trim().to_string(),
            code: self.unused_code().await?,
            status: CouponStatus::Active,
            created_at: self.clock.now_utc(),
            redeemed_at: None,
        };
        self.store.insert(&coupon).await?;

        info!("🎟️ Cupom {} gerado para o cliente {} (oferta {})", coupon.code, customer_id, coupon.offer_id);
        Ok(coupon)
    }

    /// Resgate no balcão. Dois terminais resgatando o mesmo código ao mesmo
    /// tempo: vale a última escrita.
    pub async fn redeem(&self, code: &str) -> Result<RedemptionOutcome, AppError> {
        let code = code.trim().to_uppercase();
        let Some(coupon) = self.store.find_by_code(&code).await? else {
            return Ok(RedemptionOutcome::NotFound);
        };

        if coupon.status == CouponStatus::Redeemed {
            return Ok(RedemptionOutcome::AlreadyUsed {
                redeemed_at: coupon.redeemed_at,
            });
        }

        let today = self.clock.start_of_today();
        let redeemed_today = self.store.redeemed_since(coupon.customer_id, today).await?;
        if redeemed_today.iter().any(|other| other.id != coupon.id) {
            return Ok(RedemptionOutcome::DailyLimitReached);
        }

        let Some(redeemed) = self.store.mark_redeemed(coupon.id, self.clock.now_utc()).await? else {
            return Ok(RedemptionOutcome::NotFound);
        };

        info!("✅ Cupom {} resgatado", redeemed.code);
        Ok(RedemptionOutcome::Redeemed { coupon: redeemed })
    }
}
