use std::time::Duration;

/// Health and mana pools of the player together with their regeneration rates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    mana: f32,
    max_mana: f32,
    health_regen: f32,
    mana_regen: f32,
    saved_rates: Option<(f32, f32)>,
}

impl Vitals {
    pub(crate) const fn new(
        max_health: f32,
        max_mana: f32,
        health_regen: f32,
        mana_regen: f32,
    ) -> Self {
        Self {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            health_regen,
            mana_regen,
            saved_rates: None,
        }
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Current mana.
    #[must_use]
    pub const fn mana(&self) -> f32 {
        self.mana
    }

    /// Maximum mana.
    #[must_use]
    pub const fn max_mana(&self) -> f32 {
        self.max_mana
    }

    /// Health regenerated per second.
    #[must_use]
    pub const fn health_regen(&self) -> f32 {
        self.health_regen
    }

    /// Whether a refill boost is active.
    #[must_use]
    pub const fn is_refilling(&self) -> bool {
        self.saved_rates.is_some()
    }

    pub(crate) fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    pub(crate) fn regenerate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        self.health = (self.health + self.health_regen * seconds).min(self.max_health);
        self.mana = (self.mana + self.mana_regen * seconds).min(self.max_mana);
    }

    /// Boosts regeneration so both pools reach their maximum after `duration`.
    pub(crate) fn begin_refill(&mut self, duration: Duration) {
        let seconds = duration.as_secs_f32();
        if seconds <= 0.0 {
            self.health = self.max_health;
            self.mana = self.max_mana;
            return;
        }
        if self.saved_rates.is_none() {
            self.saved_rates = Some((self.health_regen, self.mana_regen));
        }
        self.health_regen = self
            .health_regen
            .max((self.max_health - self.health) / seconds);
        self.mana_regen = self.mana_regen.max((self.max_mana - self.mana) / seconds);
    }

    pub(crate) fn end_refill(&mut self) {
        if let Some((health_regen, mana_regen)) = self.saved_rates.take() {
            self.health_regen = health_regen;
            self.mana_regen = mana_regen;
        }
        self.health = self.max_health;
        self.mana = self.max_mana;
    }
}
