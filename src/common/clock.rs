// src/common/clock.rs

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

// Fonte de tempo injetável. Os limites diários dos cupons usam a meia-noite
// local e o cache de pontos usa a expiração; ambos precisam de um relógio
// controlável nos testes.
pub trait Clock: Send + Sync + std::fmt::Debug {
    // Hora local com o offset vigente neste instante
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    /// Instante da última meia-noite local, em UTC. Aqui o offset é fixo;
    /// o relógio do sistema usa o fuso de verdade.
    fn start_of_today(&self) -> DateTime<Utc> {
        let now = self.now();
        let now_utc = now.with_timezone(&Utc);
        midnight_in(now.offset(), now_utc).unwrap_or(now_utc)
    }
}

/// Meia-noite do dia de `now` no fuso `zone`, em UTC. Usa o offset que valia
/// à meia-noite, que nos dias de troca de horário difere do atual.
pub fn midnight_in<Tz: TimeZone>(zone: &Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let midnight = now.with_timezone(zone).date_naive().and_hms_opt(0, 0, 0)?;
    zone.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn start_of_today(&self) -> DateTime<Utc> {
        let now = Utc::now();
        midnight_in(&Local, now).unwrap_or(now)
    }
}

#[cfg(test)]
pub use fake::FakeClock;
