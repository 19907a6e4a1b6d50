//! Designer-facing tuning surface for the director.
//!
//! Every section implements [`Default`] and is deserialised with
//! `#[serde(default)]`, so a config file only needs to mention the knobs it
//! changes. Durations are written as fractional seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Bounds, Position, RarityWeightTable};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed into the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The rarity table has no rows.
    #[error("rarity weight table must contain at least one row")]
    EmptyWeightTable,
    /// Row bounds are not strictly ascending.
    #[error("rarity weight table row {0} is not ordered after its predecessor")]
    UnorderedWeightTable(usize),
    /// An unbounded row appears before the final row.
    #[error("rarity weight table row {0} is unbounded but is not the last row")]
    UnboundedRowNotLast(usize),
    /// Two cards share an identifier.
    #[error("card {0} is declared more than once")]
    DuplicateCard(u32),
    /// An ordinary card would fire every tick.
    #[error("card {0} has a zero spawn interval")]
    ZeroSpawnInterval(u32),
    /// Boss traits were attached to a card outside the boss tier.
    #[error("card {0} carries boss traits but is not boss rarity")]
    BossTraitsOnOrdinaryCard(u32),
    /// The minimum interval floor is zero.
    #[error("minimum spawn interval must be positive")]
    ZeroMinimumInterval,
    /// The scaling tier interval is zero.
    #[error("scaling interval must be positive")]
    ZeroScalingInterval,
}

/// Root configuration consumed by the director.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Session seed every random stream is derived from.
    pub seed: u64,
    /// Rectangle spawn positions are clamped into; `None` is a configuration gap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_bounds: Option<Bounds>,
    /// Tiered multiplier growth.
    pub scaling: ScalingTuning,
    /// Interval composition knobs.
    pub intervals: IntervalTuning,
    /// Boss event schedule and phase timings.
    pub boss: BossTuning,
    /// Ordinary card offer cadence.
    pub offers: OfferTuning,
    /// Cooldown bonuses of enhanced variants.
    pub enhancement: EnhancementTuning,
    /// Time-varying rarity weights.
    pub rarity_table: RarityWeightTable,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_d1ec_7012_a11e,
            spawn_bounds: Some(Bounds::new(
                Position::new(-2_000.0, -2_000.0),
                Position::new(2_000.0, 2_000.0),
            )),
            scaling: ScalingTuning::default(),
            intervals: IntervalTuning::default(),
            boss: BossTuning::default(),
            offers: OfferTuning::default(),
            enhancement: EnhancementTuning::default(),
            rarity_table: RarityWeightTable::default(),
        }
    }
}

impl DirectorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intervals.min_interval.is_zero() {
            return Err(ConfigError::ZeroMinimumInterval);
        }
        if self.scaling.interval.is_zero() {
            return Err(ConfigError::ZeroScalingInterval);
        }

        let rows = self.rarity_table.rows();
        if rows.is_empty() {
            return Err(ConfigError::EmptyWeightTable);
        }
        let mut previous: Option<Duration> = None;
        for (index, row) in rows.iter().enumerate() {
            match row.until {
                None if index + 1 != rows.len() => {
                    return Err(ConfigError::UnboundedRowNotLast(index));
                }
                None => {}
                Some(until) => {
                    if previous.is_some_and(|bound| until <= bound) {
                        return Err(ConfigError::UnorderedWeightTable(index));
                    }
                    previous = Some(until);
                }
            }
        }
        Ok(())
    }
}

/// Whether a tier step multiplies or adds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// `m *= 1 + p`.
    Multiplicative,
    /// `m += p`.
    Additive,
}

/// Growth applied to one multiplier per tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTuning {
    /// Step size at tier zero.
    pub percent: f32,
    /// Extra step size added per elapsed tier, so later tiers compound faster.
    pub ramp_per_tier: f32,
    /// How the step is applied.
    pub mode: StepMode,
}

impl StepTuning {
    /// Step size in effect at `tier_index`.
    #[must_use]
    pub fn percent_at(&self, tier_index: u32) -> f32 {
        self.percent + self.ramp_per_tier * tier_index as f32
    }
}

impl Default for StepTuning {
    fn default() -> Self {
        Self {
            percent: 0.0,
            ramp_per_tier: 0.0,
            mode: StepMode::Multiplicative,
        }
    }
}

/// Tiered growth of the global multipliers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingTuning {
    /// Unpaused time per tier.
    #[serde(with = "crate::seconds")]
    pub interval: Duration,
    /// Health growth; ramps per tier.
    pub health: StepTuning,
    /// Experience reward growth.
    pub experience: StepTuning,
    /// Damage growth.
    pub damage: StepTuning,
    /// Flat spawn-interval discount accumulated per tier until the next rebase.
    #[serde(with = "crate::seconds")]
    pub flat_discount_per_tier: Duration,
}

impl Default for ScalingTuning {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            health: StepTuning {
                percent: 0.10,
                ramp_per_tier: 0.01,
                mode: StepMode::Multiplicative,
            },
            experience: StepTuning {
                percent: 0.05,
                ramp_per_tier: 0.0,
                mode: StepMode::Multiplicative,
            },
            damage: StepTuning {
                percent: 0.05,
                ramp_per_tier: 0.0,
                mode: StepMode::Additive,
            },
            flat_discount_per_tier: Duration::from_millis(50),
        }
    }
}

/// Knobs of the effective-interval composition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalTuning {
    /// Floor applied after every composition step.
    #[serde(with = "crate::seconds")]
    pub min_interval: Duration,
    /// Interval growth per additional registered source.
    pub per_extra_source_factor: f32,
    /// Flat discount per completed boss event.
    #[serde(with = "crate::seconds")]
    pub global_per_boss_discount: Duration,
    /// Interval multiplier while a boss event is active.
    pub boss_event_multiplier: f32,
    /// Fractional interval reduction of the first card picked at run start.
    pub first_card_reduction: f32,
    /// How long the first-card reductions last after registration.
    #[serde(with = "crate::seconds")]
    pub first_card_window: Duration,
    /// Fractional off-camera speed reduction of the first card picked at run start.
    pub off_camera_speed_reduction: f32,
    /// Countdown of a freshly registered source.
    #[serde(with = "crate::seconds")]
    pub first_fire_delay: Duration,
}

impl Default for IntervalTuning {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(250),
            per_extra_source_factor: 0.15,
            global_per_boss_discount: Duration::from_millis(200),
            boss_event_multiplier: 1.5,
            first_card_reduction: 0.5,
            first_card_window: Duration::from_secs(30),
            off_camera_speed_reduction: 0.3,
            first_fire_delay: Duration::from_secs(1),
        }
    }
}

/// Boss event schedule and phase timings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Rarity-clock thresholds of the first boss events, ascending.
    #[serde(with = "crate::seconds::list")]
    pub schedule: Vec<Duration>,
    /// Spacing of further events once the schedule is exhausted.
    #[serde(
        with = "crate::seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat_interval: Option<Duration>,
    /// Projectile fade before spawning is locked.
    #[serde(with = "crate::seconds")]
    pub fade_duration: Duration,
    /// Quiet period after the fade.
    #[serde(with = "crate::seconds")]
    pub buffer_duration: Duration,
    /// Pause between boss selection and boss spawn.
    #[serde(with = "crate::seconds")]
    pub breather_duration: Duration,
    /// Menace window used when the boss card leaves it unset.
    #[serde(with = "crate::seconds")]
    pub default_menace_duration: Duration,
    /// Reward delay used when the boss card leaves it unset.
    #[serde(with = "crate::seconds")]
    pub default_death_reward_delay: Duration,
    /// Cooldown fraction removed when spawning unlocks after the menace.
    pub cooldown_reduction: f32,
    /// Tier-equivalent health steps granted after each boss.
    pub bonus_steps_after_boss: u32,
    /// View size increment applied on boss spawn.
    pub camera_growth: f32,
    /// Number of boss events that may grow the camera.
    pub camera_growth_limit: u32,
    /// Duration of the post-event vitals refill.
    #[serde(with = "crate::seconds")]
    pub refill_duration: Duration,
    /// Fixed arena position of the boss.
    pub spawn_position: Position,
    /// Boss cards presented per boss selection.
    pub offer_count: usize,
    /// Offers ordinary cards before the boss selection.
    pub pre_event_offer: bool,
    /// Offers an extra ordinary card before the mandatory post-event selection.
    pub post_event_bonus_offer: bool,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            schedule: vec![
                Duration::from_secs(180),
                Duration::from_secs(420),
                Duration::from_secs(720),
            ],
            repeat_interval: Some(Duration::from_secs(300)),
            fade_duration: Duration::from_secs(1),
            buffer_duration: Duration::from_secs(2),
            breather_duration: Duration::from_millis(1_500),
            default_menace_duration: Duration::from_secs(5),
            default_death_reward_delay: Duration::ZERO,
            cooldown_reduction: 0.5,
            bonus_steps_after_boss: 2,
            camera_growth: 0.1,
            camera_growth_limit: 3,
            refill_duration: Duration::from_secs(2),
            spawn_position: Position::new(0.0, -600.0),
            offer_count: 3,
            pre_event_offer: false,
            post_event_bonus_offer: true,
        }
    }
}

impl BossTuning {
    /// Rarity-clock threshold at which the event with `boss_index` starts.
    ///
    /// Indices past the schedule are spaced by the repeat interval after the
    /// last scheduled threshold; without one they never start.
    #[must_use]
    pub fn threshold(&self, boss_index: u32) -> Option<Duration> {
        let index = usize::try_from(boss_index).ok()?;
        if let Some(threshold) = self.schedule.get(index) {
            return Some(*threshold);
        }
        let repeat = self.repeat_interval.filter(|repeat| !repeat.is_zero())?;
        let beyond = u32::try_from(index - self.schedule.len() + 1).ok()?;
        let last = self.schedule.last().copied().unwrap_or(Duration::ZERO);
        Some(last.saturating_add(repeat.saturating_mul(beyond)))
    }
}

/// Cadence of ordinary card offers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferTuning {
    /// Cards presented per offer.
    pub offer_count: usize,
    /// Rarity-clock spacing of periodic offers; `None` disables them.
    #[serde(
        with = "crate::seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub periodic_interval: Option<Duration>,
}

impl Default for OfferTuning {
    fn default() -> Self {
        Self {
            offer_count: 3,
            periodic_interval: Some(Duration::from_secs(60)),
        }
    }
}

/// Per-tier cooldown bonuses granted to enhanced variants of each behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementTuning {
    /// Shot cooldown reduction per tier above base.
    pub ranged_shot_bonus: f32,
    /// Dash cooldown reduction per tier above base.
    pub charger_dash_bonus: f32,
    /// Summon cooldown reduction per tier above base.
    pub summoner_cast_bonus: f32,
    /// Lowest cooldown scale an enhanced variant may reach.
    pub min_cooldown_scale: f32,
}

impl Default for EnhancementTuning {
    fn default() -> Self {
        Self {
            ranged_shot_bonus: 0.10,
            charger_dash_bonus: 0.15,
            summoner_cast_bonus: 0.20,
            min_cooldown_scale: 0.4,
        }
    }
}
