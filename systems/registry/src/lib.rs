#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Registry of unlocked spawn sources and their effective intervals.
//!
//! Each selected card becomes one [`RegisteredSource`] with its own countdown.
//! The interval a source waits between fires is recomposed from the template
//! every time it is needed, so changes to scaling, registry size, or the boss
//! state take effect on the very next countdown.

use std::{collections::BTreeSet, time::Duration};

use spawn_director_core::{
    BehaviorKind, BlueprintId, CardId, CardTemplate, EnhancementTuning, IntervalTuning, Rarity,
};
use tracing::{debug, info};

/// Uniqueness key of a registered source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    /// Blueprint the source instantiates.
    pub blueprint: BlueprintId,
    /// Behaviour of the instantiated entity.
    pub behavior: BehaviorKind,
}

impl SourceKey {
    /// Derives the key of a template.
    #[must_use]
    pub const fn of(template: &CardTemplate) -> Self {
        Self {
            blueprint: template.blueprint,
            behavior: template.behavior,
        }
    }
}

/// Run phase a card was picked in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationPhase {
    /// The selection that opens the run. Only here does the first card get
    /// the temporary interval and off-camera speed discounts.
    Initial,
    /// Any later selection.
    Running,
}

/// External state the interval composition depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntervalContext {
    /// Flat discount accumulated by scaling tiers since the last rebase.
    pub phase_flat_discount: Duration,
    /// Boss events completed this run.
    pub completed_boss_count: u32,
    /// Whether a boss event is running.
    pub boss_event_active: bool,
    /// Hard suppression of every non-boss source.
    pub suppressed: bool,
}

/// Outcome of [`SourceRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// A new source was added.
    Added(SourceKey),
    /// An existing source with the same key now points at the new template.
    Updated(SourceKey),
}

/// Runtime state of a selected card.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredSource {
    template: CardTemplate,
    rarity: Rarity,
    countdown: Duration,
    first_fire: bool,
    interval_override: Option<Duration>,
    discount_expires_at: Option<Duration>,
}

impl RegisteredSource {
    /// Template the source currently references.
    #[must_use]
    pub fn template(&self) -> &CardTemplate {
        &self.template
    }

    /// Rarity the source resolved to for this run.
    #[must_use]
    pub const fn rarity(&self) -> Rarity {
        self.rarity
    }

    /// Time left until the next fire.
    #[must_use]
    pub const fn countdown(&self) -> Duration {
        self.countdown
    }

    /// Whether the source has yet to fire.
    #[must_use]
    pub const fn is_first_fire(&self) -> bool {
        self.first_fire
    }

    /// Run-specific replacement of the template interval.
    #[must_use]
    pub const fn interval_override(&self) -> Option<Duration> {
        self.interval_override
    }

    /// Uniqueness key of the source.
    #[must_use]
    pub const fn key(&self) -> SourceKey {
        SourceKey::of(&self.template)
    }

    fn discount_active(&self, clock: Duration) -> bool {
        self.discount_expires_at
            .is_some_and(|expires_at| clock < expires_at)
    }
}

/// Source that reached the end of its countdown this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct FiredSource {
    /// Template of the source.
    pub template: CardTemplate,
    /// Resolved rarity of the source.
    pub rarity: Rarity,
    /// Whether this was the source's first fire.
    pub first_fire: bool,
    /// Ability cooldown scale of the spawned entities.
    pub cooldown_scale: f32,
    /// Off-camera speed scale of the spawned entities.
    pub off_camera_speed_scale: f32,
}

/// Typed accessor yielding the per-tier cooldown bonus of one behaviour.
pub type CooldownBonus = fn(&EnhancementTuning) -> f32;

/// Behaviours whose enhanced variants fire their ability more often.
///
/// Behaviours missing from this table never receive a cooldown bonus.
pub const COOLDOWN_STRATEGIES: [(BehaviorKind, CooldownBonus); 3] = [
    (BehaviorKind::Ranged, |tuning| tuning.ranged_shot_bonus),
    (BehaviorKind::Charger, |tuning| tuning.charger_dash_bonus),
    (BehaviorKind::Summoner, |tuning| tuning.summoner_cast_bonus),
];

/// Looks up the cooldown bonus accessor of a behaviour.
#[must_use]
pub fn cooldown_strategy(behavior: BehaviorKind) -> Option<CooldownBonus> {
    COOLDOWN_STRATEGIES
        .iter()
        .find(|(kind, _)| *kind == behavior)
        .map(|(_, accessor)| *accessor)
}

/// Cooldown scale of an entity spawned at `rarity` from `template`.
///
/// Each tier the resolved rarity sits above the template's base rarity
/// applies the behaviour's bonus once, down to the configured minimum scale.
#[must_use]
pub fn cooldown_scale(template: &CardTemplate, rarity: Rarity, tuning: &EnhancementTuning) -> f32 {
    let tiers_above = match (rarity.tier_index(), template.rarity.tier_index()) {
        (Some(resolved), Some(base)) => resolved.saturating_sub(base),
        _ => 0,
    };
    if tiers_above == 0 {
        return 1.0;
    }
    let Some(bonus) = cooldown_strategy(template.behavior) else {
        return 1.0;
    };
    (1.0 - bonus(tuning) * tiers_above as f32).max(tuning.min_cooldown_scale)
}

/// Set of unlocked spawn sources.
#[derive(Clone, Debug)]
pub struct SourceRegistry {
    tuning: IntervalTuning,
    enhancement: EnhancementTuning,
    sources: Vec<RegisteredSource>,
    selected: BTreeSet<CardId>,
    clock: Duration,
    first_card_claimed: bool,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(tuning: IntervalTuning, enhancement: EnhancementTuning) -> Self {
        Self {
            tuning,
            enhancement,
            sources: Vec::new(),
            selected: BTreeSet::new(),
            clock: Duration::ZERO,
            first_card_claimed: false,
        }
    }

    /// Registers a selected card, merging it into an existing source with the same key.
    ///
    /// A merge swaps the template reference and resolved rarity but keeps the
    /// countdown progress of the existing source.
    pub fn register(
        &mut self,
        template: CardTemplate,
        rarity: Rarity,
        interval_override: Option<Duration>,
        phase: RegistrationPhase,
        context: &IntervalContext,
    ) -> Registration {
        let key = SourceKey::of(&template);
        let _ = self.selected.insert(template.id);

        if let Some(existing) = self.sources.iter_mut().find(|source| source.key() == key) {
            info!(card = template.id.get(), ?rarity, "spawn source updated");
            existing.template = template;
            existing.rarity = rarity;
            if interval_override.is_some() {
                existing.interval_override = interval_override;
            }
            return Registration::Updated(key);
        }

        let discounted =
            phase == RegistrationPhase::Initial && !template.is_boss_tier() && !self.first_card_claimed;
        if discounted {
            self.first_card_claimed = true;
        }

        info!(
            card = template.id.get(),
            ?rarity,
            discounted,
            "spawn source registered"
        );
        let discount_expires_at =
            discounted.then(|| self.clock.saturating_add(self.tuning.first_card_window));
        self.sources.push(RegisteredSource {
            template,
            rarity,
            countdown: Duration::ZERO,
            first_fire: true,
            interval_override,
            discount_expires_at,
        });

        let index = self.sources.len() - 1;
        let interval = self.effective_interval(&self.sources[index], context);
        self.sources[index].countdown = self.tuning.first_fire_delay.min(interval);
        Registration::Added(key)
    }

    /// Composes the interval `source` waits between fires.
    ///
    /// Steps, each floored at the minimum interval: base or override, first-card
    /// discount, phase flat discount, registry-size penalty, per-boss global
    /// discount, boss-event multiplier. Boss-tier sources stop after the floored
    /// base.
    #[must_use]
    pub fn effective_interval(
        &self,
        source: &RegisteredSource,
        context: &IntervalContext,
    ) -> Duration {
        let base = source
            .interval_override
            .unwrap_or(source.template.spawn_interval);
        let floor = self.tuning.min_interval;
        let mut interval = base.max(floor);
        if source.template.is_boss_tier() {
            return interval;
        }


        if source.discount_active(self.clock) {
            interval = scale(interval, 1.0 - self.tuning.first_card_reduction).max(floor);
        }

        interval = interval
            .saturating_sub(context.phase_flat_discount)
            .max(floor);

        let extra_sources = self.sources.len().saturating_sub(1) as f32;
        interval = scale(
            interval,
            1.0 + self.tuning.per_extra_source_factor * extra_sources,
        )
        .max(floor);

        let boss_discount = self
            .tuning
            .global_per_boss_discount
            .saturating_mul(context.completed_boss_count);
        interval = interval.saturating_sub(boss_discount).max(floor);

        if context.boss_event_active {
            interval = scale(interval, self.tuning.boss_event_multiplier).max(floor);
        }

        interval
    }

    /// Advances every countdown and returns the sources that fire this tick.
    ///
    /// A source fires at most once per tick; overshoot carries into its next
    /// countdown. While suppressed, non-boss countdowns are frozen.
    pub fn tick(&mut self, dt: Duration, context: &IntervalContext) -> Vec<FiredSource> {
        self.clock = self.clock.saturating_add(dt);
        if dt.is_zero() || self.sources.is_empty() {
            return Vec::new();
        }

        let intervals: Vec<Duration> = self
            .sources
            .iter()
            .map(|source| self.effective_interval(source, context))
            .collect();

        let mut fired = Vec::new();
        for (source, interval) in self.sources.iter_mut().zip(intervals) {
            if context.suppressed && !source.template.is_boss_tier() {
                continue;
            }
            if dt < source.countdown {
                source.countdown -= dt;
                continue;
            }

            let overshoot = dt - source.countdown;
            source.countdown = interval.saturating_sub(overshoot);
            let speed_scale = if source.discount_active(self.clock) {
                (1.0 - self.tuning.off_camera_speed_reduction).max(0.0)
            } else {
                1.0
            };
            debug!(
                card = source.template.id.get(),
                next_in_ms = source.countdown.as_millis() as u64,
                "spawn source fired"
            );
            fired.push(FiredSource {
                template: source.template.clone(),
                rarity: source.rarity,
                first_fire: source.first_fire,
                cooldown_scale: cooldown_scale(&source.template, source.rarity, &self.enhancement),
                off_camera_speed_scale: speed_scale,
            });
            source.first_fire = false;
        }
        fired
    }

    /// Restarts every countdown at its effective interval shortened by `fraction`.
    pub fn reset_countdowns(&mut self, fraction: f32, context: &IntervalContext) {
        let keep = 1.0 - fraction.clamp(0.0, 1.0);
        let intervals: Vec<Duration> = self
            .sources
            .iter()
            .map(|source| self.effective_interval(source, context))
            .collect();
        for (source, interval) in self.sources.iter_mut().zip(intervals) {
            source.countdown = scale(interval, keep);
        }
    }

    /// Removes every source and forgets which cards were selected.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.selected.clear();
    }

    /// Restores the registry to the state of a fresh run.
    pub fn reset(&mut self) {
        self.clear();
        self.clock = Duration::ZERO;
        self.first_card_claimed = false;
    }

    /// Whether `card` was registered since the last clear.
    #[must_use]
    pub fn was_selected(&self, card: CardId) -> bool {
        self.selected.contains(&card)
    }

    /// Filters `templates` down to cards not selected since the last clear.
    pub fn unselected<'a>(
        &self,
        templates: impl IntoIterator<Item = &'a CardTemplate>,
    ) -> Vec<&'a CardTemplate> {
        templates
            .into_iter()
            .filter(|template| !self.selected.contains(&template.id))
            .collect()
    }

    /// Registered sources in registration order.
    #[must_use]
    pub fn sources(&self) -> &[RegisteredSource] {
        &self.sources
    }

    /// Looks up a source by key.
    #[must_use]
    pub fn get(&self, key: SourceKey) -> Option<&RegisteredSource> {
        self.sources.iter().find(|source| source.key() == key)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn scale(interval: Duration, factor: f32) -> Duration {
    if !factor.is_finite() || factor <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(interval.as_secs_f64() * f64::from(factor)).unwrap_or(Duration::MAX)
}
