#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Persistent, time-driven multiplier store.
//!
//! Every tracked multiplier is kept as a `base × phase` pair. Tier steps only
//! touch the phase half; a rebase folds the phase into the base so the value
//! observed by callers never jumps, while later tiers grow from the new
//! baseline instead of the run's origin.

use std::time::Duration;

use spawn_director_core::{ScalingTuning, StatMultipliers, StepMode, StepTuning};
use tracing::debug;

/// Multiplier tracked as a persistent base and a per-phase factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Multiplier {
    base: f32,
    phase: f32,
}

impl Multiplier {
    const UNIT: Self = Self {
        base: 1.0,
        phase: 1.0,
    };

    /// Persistent half of the multiplier.
    #[must_use]
    pub const fn base(&self) -> f32 {
        self.base
    }

    /// Half accumulated since the last rebase.
    #[must_use]
    pub const fn phase(&self) -> f32 {
        self.phase
    }

    /// Value observed by callers.
    #[must_use]
    pub fn effective(&self) -> f32 {
        self.base * self.phase
    }

    fn step(&mut self, mode: StepMode, percent: f32) {
        match mode {
            StepMode::Multiplicative => self.phase *= 1.0 + percent,
            StepMode::Additive => self.phase += percent,
        }
    }

    fn rebase(&mut self) {
        self.base = self.effective();
        self.phase = 1.0;
    }
}

/// Time-driven scaling state shared by every spawn in the run.
#[derive(Clone, Debug)]
pub struct ScalingState {
    tuning: ScalingTuning,
    accumulator: Duration,
    tier_index: u32,
    paused: bool,
    health: Multiplier,
    experience: Multiplier,
    damage: Multiplier,
    phase_flat_discount: Duration,
    completed_boss_count: u32,
}

impl ScalingState {
    /// Creates a state at the run's origin.
    #[must_use]
    pub fn new(tuning: ScalingTuning) -> Self {
        Self {
            tuning,
            accumulator: Duration::ZERO,
            tier_index: 0,
            paused: false,
            health: Multiplier::UNIT,
            experience: Multiplier::UNIT,
            damage: Multiplier::UNIT,
            phase_flat_discount: Duration::ZERO,
            completed_boss_count: 0,
        }
    }

    /// Advances the tier timer; every full interval applies one tier step.
    pub fn tick(&mut self, dt: Duration) {
        if self.paused || dt.is_zero() || self.tuning.interval.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        while self.accumulator >= self.tuning.interval {
            self.accumulator -= self.tuning.interval;
            self.advance_tier();
        }
    }

    fn advance_tier(&mut self) {
        let tier = self.tier_index;
        apply_step(&mut self.health, &self.tuning.health, tier);
        apply_step(&mut self.experience, &self.tuning.experience, tier);
        apply_step(&mut self.damage, &self.tuning.damage, tier);
        self.phase_flat_discount = self
            .phase_flat_discount
            .saturating_add(self.tuning.flat_discount_per_tier);
        self.tier_index = tier.saturating_add(1);
        debug!(
            tier = self.tier_index,
            health = self.health.effective(),
            "scaling tier advanced"
        );
    }

    /// Applies `steps` extra health steps at the current tier without consuming a tier.
    pub fn apply_bonus_steps(&mut self, steps: u32) {
        for _ in 0..steps {
            apply_step(&mut self.health, &self.tuning.health, self.tier_index);
        }
    }

    /// Folds every phase factor into its base and clears the phase flat discount.
    pub fn rebase(&mut self) {
        self.health.rebase();
        self.experience.rebase();
        self.damage.rebase();
        self.phase_flat_discount = Duration::ZERO;
    }

    /// Freezes tier progression.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes tier progression where it stopped.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Counts one more completed boss event.
    pub fn record_boss_completed(&mut self) {
        self.completed_boss_count = self.completed_boss_count.saturating_add(1);
    }

    /// Restores the run's origin.
    pub fn reset(&mut self) {
        *self = Self::new(self.tuning);
    }

    /// Effective health multiplier.
    #[must_use]
    pub fn health_multiplier(&self) -> f32 {
        self.health.effective()
    }

    /// Effective experience multiplier.
    #[must_use]
    pub fn exp_multiplier(&self) -> f32 {
        self.experience.effective()
    }

    /// Effective damage multiplier.
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        self.damage.effective()
    }

    /// All three effective multipliers.
    #[must_use]
    pub fn multipliers(&self) -> StatMultipliers {
        StatMultipliers::new(
            self.health_multiplier(),
            self.exp_multiplier(),
            self.damage_multiplier(),
        )
    }

    /// Health multiplier split into base and phase halves.
    #[must_use]
    pub const fn health(&self) -> Multiplier {
        self.health
    }

    /// Experience multiplier split into base and phase halves.
    #[must_use]
    pub const fn experience(&self) -> Multiplier {
        self.experience
    }

    /// Damage multiplier split into base and phase halves.
    #[must_use]
    pub const fn damage(&self) -> Multiplier {
        self.damage
    }

    /// Number of tiers reached while unpaused.
    #[must_use]
    pub const fn tier_index(&self) -> u32 {
        self.tier_index
    }

    /// Flat interval discount accumulated since the last rebase.
    #[must_use]
    pub const fn phase_flat_discount(&self) -> Duration {
        self.phase_flat_discount
    }

    /// Boss events completed this run.
    #[must_use]
    pub const fn completed_boss_count(&self) -> u32 {
        self.completed_boss_count
    }

    /// Whether tier progression is frozen.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }
}

fn apply_step(multiplier: &mut Multiplier, tuning: &StepTuning, tier_index: u32) {
    multiplier.step(tuning.mode, tuning.percent_at(tier_index));
}
