#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Boss-event orchestration as an explicit, tick-polled state machine.
//!
//! One [`BossEventOrchestrator`] exists per boss index. While it runs it owns
//! every spawning decision: it suppresses ordinary sources, walks the boss
//! sequence one suspension point at a time, and calls back into the scaling
//! state and source registry at fixed checkpoints. Every collaborator gap is
//! logged and skipped so the sequence always returns to [`BossPhase::Idle`].

use std::{cell::OnceCell, time::Duration};

use spawn_director_core::{
    BossTuning, CardCatalog, CardId, CardOffer, CardTemplate, Command, EntityHandle, Event,
    OfferId, OfferPurpose, OfferSequence, Rarity, RarityWeightTable, SimulationContext,
    StatMultipliers,
};
use spawn_director_system_rarity::RarityScheduler;
use spawn_director_system_registry::{IntervalContext, RegistrationPhase, SourceRegistry};
use spawn_director_system_scaling::ScalingState;
use tracing::{debug, info, warn};

/// Externally visible phase of a boss event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BossPhase {
    /// No boss event is running.
    Idle,
    /// Waiting for every ordinary hostile to disappear.
    AwaitClear,
    /// Player projectiles fade out while spawning and auto-attack are locked.
    FadeAndLockSpawning,
    /// Short pause after the lock.
    Buffer,
    /// Optional ordinary card pick before the boss is chosen.
    PreEventCardSelection,
    /// Choice of the boss for this event.
    BossCardSelection,
    /// Short pause before the boss appears.
    Breather,
    /// The boss is being instantiated.
    BossSpawn,
    /// The boss is invulnerable and ordinary sources are hard-suppressed.
    Menace,
    /// Spawning and auto-attack are being re-enabled.
    PostMenaceUnlock,
    /// Waiting for the boss-death signal.
    AwaitBossDeath,
    /// Letting defeat cleanup settle before deferred experience is granted.
    DeathCleanup,
    /// The source registry is being emptied.
    ClearRegistry,
    /// Scaling resumes and rebases onto the new baseline.
    ResumeScalingAndRebase,
    /// Optional extra ordinary card pick after the boss is defeated.
    PostEventBonusSelection,
    /// Mandatory ordinary card pick that repopulates the registry.
    PostEventCardSelection,
    /// Health and mana refill before the event ends.
    Refill,
}

impl BossPhase {
    /// Mutually exclusive phase flags derived from the phase.
    #[must_use]
    pub const fn flags(self) -> PhaseFlags {
        PhaseFlags {
            waiting_for_clear: matches!(self, Self::AwaitClear),
            menace_active: matches!(self, Self::Menace),
            card_selection_active: matches!(
                self,
                Self::PreEventCardSelection
                    | Self::BossCardSelection
                    | Self::PostEventBonusSelection
                    | Self::PostEventCardSelection
            ),
            death_cleanup_in_progress: matches!(self, Self::DeathCleanup),
        }
    }

    /// Whether ordinary sources must stay frozen in this phase.
    #[must_use]
    pub const fn suppresses_spawning(self) -> bool {
        matches!(
            self,
            Self::AwaitClear
                | Self::FadeAndLockSpawning
                | Self::Buffer
                | Self::PreEventCardSelection
                | Self::BossCardSelection
                | Self::Breather
                | Self::BossSpawn
                | Self::Menace
                | Self::DeathCleanup
        )
    }

    /// Whether a boss event is running.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Phase flags of a boss event. At most one is set at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    /// Waiting for ordinary hostiles to clear.
    pub waiting_for_clear: bool,
    /// The menace window is running.
    pub menace_active: bool,
    /// A card selection owned by the event is pending.
    pub card_selection_active: bool,
    /// Post-death cleanup is running and experience is deferred.
    pub death_cleanup_in_progress: bool,
}

impl PhaseFlags {
    /// Number of flags that are set.
    #[must_use]
    pub fn count(&self) -> usize {
        [
            self.waiting_for_clear,
            self.menace_active,
            self.card_selection_active,
            self.death_cleanup_in_progress,
        ]
        .into_iter()
        .filter(|flag| *flag)
        .count()
    }
}

/// Data describing the boss event in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BossEventContext {
    /// Zero-based index of the event within the run.
    pub boss_index: u32,
    /// Boss card selected for the event.
    pub boss_card: Option<CardId>,
    /// Per-event multipliers stacked on top of global scaling.
    pub multipliers: StatMultipliers,
    /// Invulnerability window after the boss spawns.
    pub menace_duration: Duration,
    /// Delay before deferred experience is granted.
    pub death_reward_delay: Duration,
}

/// Everything a single orchestrator step may read or mutate.
#[derive(Debug)]
pub struct BossStep<'a> {
    /// Events broadcast by the world since the previous step.
    pub events: &'a [Event],
    /// Pause-aware time elapsed since the previous step.
    pub dt: Duration,
    /// Snapshot of the world outside the director.
    pub context: &'a SimulationContext,
    /// Templates available for the run.
    pub catalog: &'a CardCatalog,
    /// Scaling state shared with the director.
    pub scaling: &'a mut ScalingState,
    /// Source registry shared with the director.
    pub registry: &'a mut SourceRegistry,
    /// Seeded scheduler used to draft offers.
    pub scheduler: &'a mut RarityScheduler,
    /// Rarity table drafts are weighted by.
    pub rarity_table: &'a RarityWeightTable,
    /// Frozen rarity clock of the run.
    pub rarity_clock: Duration,
    /// Offer identifiers shared with the director.
    pub offers: &'a mut OfferSequence,
    /// Command sink.
    pub out: &'a mut Vec<Command>,
}

#[derive(Clone, Debug, PartialEq)]
struct PendingOffer {
    offer: OfferId,
    candidates: Vec<CardOffer>,
}

/// Offered card the player took.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Pick {
    card: CardId,
    rarity: Rarity,
    interval_override: Option<Duration>,
}

impl PendingOffer {
    fn resolve(&self, events: &[Event]) -> Option<Pick> {
        events.iter().find_map(|event| match event {
            Event::CardSelected {
                offer,
                card,
                interval_override,
            } if *offer == self.offer => {
                let pick = self
                    .candidates
                    .iter()
                    .find(|candidate| candidate.card == *card)
                    .map(|candidate| Pick {
                        card: candidate.card,
                        rarity: candidate.rarity,
                        interval_override: *interval_override,
                    });
                if pick.is_none() {
                    debug!(card = card.get(), "ignoring pick of a card that was not offered");
                }
                pick
            }
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Stage {
    Idle,
    AwaitClear,
    FadeAndLockSpawning { remaining: Duration },
    Buffer { remaining: Duration },
    PreEventCardSelection { pending: Option<PendingOffer> },
    BossCardSelection { pending: Option<PendingOffer> },
    Breather { remaining: Duration },
    BossSpawn,
    Menace { remaining: Duration },
    PostMenaceUnlock,
    AwaitBossDeath,
    DeathCleanup { entered_at: u64, remaining: Duration },
    ClearRegistry,
    ResumeScalingAndRebase,
    PostEventCardSelection { mandatory: bool, pending: Option<PendingOffer> },
    Refill { remaining: Option<Duration> },
}

impl Stage {
    const fn phase(&self) -> BossPhase {
        match self {
            Self::Idle => BossPhase::Idle,
            Self::AwaitClear => BossPhase::AwaitClear,
            Self::FadeAndLockSpawning { .. } => BossPhase::FadeAndLockSpawning,
            Self::Buffer { .. } => BossPhase::Buffer,
            Self::PreEventCardSelection { .. } => BossPhase::PreEventCardSelection,
            Self::BossCardSelection { .. } => BossPhase::BossCardSelection,
            Self::Breather { .. } => BossPhase::Breather,
            Self::BossSpawn => BossPhase::BossSpawn,
            Self::Menace { .. } => BossPhase::Menace,
            Self::PostMenaceUnlock => BossPhase::PostMenaceUnlock,
            Self::AwaitBossDeath => BossPhase::AwaitBossDeath,
            Self::DeathCleanup { .. } => BossPhase::DeathCleanup,
            Self::ClearRegistry => BossPhase::ClearRegistry,
            Self::ResumeScalingAndRebase => BossPhase::ResumeScalingAndRebase,
            Self::PostEventCardSelection {
                mandatory: false, ..
            } => BossPhase::PostEventBonusSelection,
            Self::PostEventCardSelection {
                mandatory: true, ..
            } => BossPhase::PostEventCardSelection,
            Self::Refill { .. } => BossPhase::Refill,
        }
    }
}

enum Flow {
    Stay(Stage),
    Next(Stage),
}

enum OfferProgress {
    Waiting(Option<PendingOffer>),
    Picked(Pick),
    Skipped,
}

/// Long-lived sequential process driving a single boss event.
#[derive(Clone, Debug)]
pub struct BossEventOrchestrator {
    tuning: BossTuning,
    ordinary_offer_count: usize,
    event: BossEventContext,
    stage: Stage,
    boss_handle: Option<EntityHandle>,
    boss_reward: OnceCell<u32>,
    queued_experience: u64,
    skipped: bool,
    steps: u64,
}

impl BossEventOrchestrator {
    /// Starts the event for `boss_index`. Normal spawning is suppressed from here on.
    #[must_use]
    pub fn new(boss_index: u32, tuning: BossTuning, ordinary_offer_count: usize) -> Self {
        info!(boss_index, "boss event started");
        Self {
            event: BossEventContext {
                boss_index,
                boss_card: None,
                multipliers: StatMultipliers::IDENTITY,
                menace_duration: tuning.default_menace_duration,
                death_reward_delay: tuning.default_death_reward_delay,
            },
            tuning,
            ordinary_offer_count,
            stage: Stage::AwaitClear,
            boss_handle: None,
            boss_reward: OnceCell::new(),
            queued_experience: 0,
            skipped: false,
            steps: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BossPhase {
        self.stage.phase()
    }

    /// Phase flags of the current phase.
    #[must_use]
    pub const fn flags(&self) -> PhaseFlags {
        self.phase().flags()
    }

    /// Data describing the event.
    #[must_use]
    pub const fn event(&self) -> &BossEventContext {
        &self.event
    }

    /// Handle of the spawned boss, once the world confirmed it.
    #[must_use]
    pub const fn boss_handle(&self) -> Option<EntityHandle> {
        self.boss_handle
    }

    /// Whether the event ran without a boss because no boss template existed.
    #[must_use]
    pub const fn was_skipped(&self) -> bool {
        self.skipped
    }

    /// Interval context ordinary sources observe while this event runs.
    #[must_use]
    pub fn interval_context(&self, scaling: &ScalingState) -> IntervalContext {
        let phase = self.phase();
        IntervalContext {
            phase_flat_discount: scaling.phase_flat_discount(),
            completed_boss_count: scaling.completed_boss_count(),
            boss_event_active: phase.is_active(),
            suppressed: phase.suppresses_spawning(),
        }
    }

    /// Polls the state machine once and returns the phase it suspended in.
    ///
    /// Instant phases chain within one step; timed phases consume `dt` and
    /// carry leftover time into the next phase.
    pub fn step(&mut self, step: &mut BossStep<'_>) -> BossPhase {
        self.steps = self.steps.wrapping_add(1);
        self.observe(step);

        let mut budget = step.dt;
        loop {
            let stage = std::mem::replace(&mut self.stage, Stage::Idle);
            let before = stage.phase();
            match self.advance(stage, step, &mut budget) {
                Flow::Stay(stage) => {
                    self.stage = stage;
                    break;
                }
                Flow::Next(stage) => {
                    debug!(
                        boss_index = self.event.boss_index,
                        from = ?before,
                        to = ?stage.phase(),
                        "boss phase transition"
                    );
                    self.stage = stage;
                    if self.stage == Stage::Idle {
                        info!(
                            boss_index = self.event.boss_index,
                            skipped = self.skipped,
                            "boss event finished"
                        );
                        break;
                    }
                }
            }
        }
        self.phase()
    }

    fn observe(&mut self, step: &BossStep<'_>) {
        for event in step.events {
            match event {
                Event::BossSpawned { handle, .. } => self.boss_handle = Some(*handle),
                Event::BossDefeated { handle, experience } => {
                    if self.boss_handle != Some(*handle) {
                        debug!(handle = handle.get(), "ignoring defeat of an unknown boss");
                        continue;
                    }
                    if self.boss_reward.set(*experience).is_err() {
                        debug!(handle = handle.get(), "ignoring repeated boss-death signal");
                    }
                }
                Event::HostilesDefeated {
                    experience,
                    deferred: true,
                    ..
                } => {
                    if self.boss_reward.get().is_some() {
                        self.queued_experience =
                            self.queued_experience.saturating_add(u64::from(*experience));
                    }
                }
                _ => {}
            }
        }
    }

    fn advance(&mut self, stage: Stage, step: &mut BossStep<'_>, budget: &mut Duration) -> Flow {
        match stage {
            Stage::Idle => Flow::Stay(Stage::Idle),
            Stage::AwaitClear => {
                if step.context.live_hostiles > 0 {
                    return Flow::Stay(Stage::AwaitClear);
                }
                self.lock(step);
                Flow::Next(Stage::FadeAndLockSpawning {
                    remaining: self.tuning.fade_duration,
                })
            }
            Stage::FadeAndLockSpawning { remaining } => {
                match wait(remaining, budget) {
                    Some(remaining) => Flow::Stay(Stage::FadeAndLockSpawning { remaining }),
                    None => {
                        if step.context.collaborators.projectiles {
                            step.out.push(Command::DestroyProjectiles);
                        }
                        Flow::Next(Stage::Buffer {
                            remaining: self.tuning.buffer_duration,
                        })
                    }
                }
            }
            Stage::Buffer { remaining } => match wait(remaining, budget) {
                Some(remaining) => Flow::Stay(Stage::Buffer { remaining }),
                None if self.tuning.pre_event_offer => {
                    Flow::Next(Stage::PreEventCardSelection { pending: None })
                }
                None => Flow::Next(Stage::BossCardSelection { pending: None }),
            },
            Stage::PreEventCardSelection { pending } => {
                match self.ordinary_offer(pending, OfferPurpose::PreBoss, step) {
                    OfferProgress::Waiting(pending) => {
                        Flow::Stay(Stage::PreEventCardSelection { pending })
                    }
                    OfferProgress::Picked(pick) => {
                        self.register(pick, step);
                        Flow::Next(Stage::BossCardSelection { pending: None })
                    }
                    OfferProgress::Skipped => Flow::Next(Stage::BossCardSelection { pending: None }),
                }
            }
            Stage::BossCardSelection { pending } => match self.boss_offer(pending, step) {
                OfferProgress::Waiting(pending) => Flow::Stay(Stage::BossCardSelection { pending }),
                OfferProgress::Picked(pick) => match step.catalog.get(pick.card) {
                    Some(template) => {
                        self.adopt_boss(template);
                        Flow::Next(Stage::Breather {
                            remaining: self.tuning.breather_duration,
                        })
                    }
                    None => {
                        warn!(card = pick.card.get(), "selected boss card is not in the catalog");
                        self.skipped = true;
                        Flow::Next(Stage::PostMenaceUnlock)
                    }
                },
                OfferProgress::Skipped => {
                    warn!(
                        boss_index = self.event.boss_index,
                        "no boss template available; skipping boss spawn"
                    );
                    self.skipped = true;
                    Flow::Next(Stage::PostMenaceUnlock)
                }
            },
            Stage::Breather { remaining } => match wait(remaining, budget) {
                Some(remaining) => Flow::Stay(Stage::Breather { remaining }),
                None => Flow::Next(Stage::BossSpawn),
            },
            Stage::BossSpawn => {
                self.spawn_boss(step);
                Flow::Next(Stage::Menace {
                    remaining: self.event.menace_duration,
                })
            }
            Stage::Menace { remaining } => match wait(remaining, budget) {
                Some(remaining) => Flow::Stay(Stage::Menace { remaining }),
                None => Flow::Next(Stage::PostMenaceUnlock),
            },
            Stage::PostMenaceUnlock => {
                self.unlock(step);
                Flow::Next(Stage::AwaitBossDeath)
            }
            Stage::AwaitBossDeath => {
                if self.skipped {
                    return Flow::Next(Stage::ClearRegistry);
                }
                let Some(reward) = self.boss_reward.get().copied() else {
                    return Flow::Stay(Stage::AwaitBossDeath);
                };
                step.out.push(Command::MassDefeatHostiles);
                let scaled = (reward as f32
                    * step.scaling.exp_multiplier()
                    * self.event.multipliers.experience)
                    .round();
                self.queued_experience = self
                    .queued_experience
                    .saturating_add(scaled.max(0.0) as u64);
                Flow::Next(Stage::DeathCleanup {
                    entered_at: self.steps,
                    remaining: self.event.death_reward_delay,
                })
            }
            Stage::DeathCleanup {
                entered_at,
                remaining,
            } => {
                if self.steps <= entered_at {
                    return Flow::Stay(Stage::DeathCleanup {
                        entered_at,
                        remaining,
                    });
                }
                match wait(remaining, budget) {
                    Some(remaining) => Flow::Stay(Stage::DeathCleanup {
                        entered_at,
                        remaining,
                    }),
                    None => {
                        self.grant_queued_experience(step);
                        Flow::Next(Stage::ClearRegistry)
                    }
                }
            }
            Stage::ClearRegistry => {
                step.registry.clear();
                Flow::Next(Stage::ResumeScalingAndRebase)
            }
            Stage::ResumeScalingAndRebase => {
                step.scaling.resume();
                if !self.skipped {
                    step.scaling
                        .apply_bonus_steps(self.tuning.bonus_steps_after_boss);
                    step.scaling.rebase();
                    step.scaling.record_boss_completed();
                }
                Flow::Next(Stage::PostEventCardSelection {
                    mandatory: !self.tuning.post_event_bonus_offer,
                    pending: None,
                })
            }
            Stage::PostEventCardSelection { mandatory, pending } => {
                let purpose = if mandatory {
                    OfferPurpose::PostBoss
                } else {
                    OfferPurpose::PostBossBonus
                };
                let next = if mandatory {
                    Stage::Refill { remaining: None }
                } else {
                    Stage::PostEventCardSelection {
                        mandatory: true,
                        pending: None,
                    }
                };
                match self.ordinary_offer(pending, purpose, step) {
                    OfferProgress::Waiting(pending) => {
                        Flow::Stay(Stage::PostEventCardSelection { mandatory, pending })
                    }
                    OfferProgress::Picked(pick) => {
                        self.register(pick, step);
                        Flow::Next(next)
                    }
                    OfferProgress::Skipped => Flow::Next(next),
                }
            }
            Stage::Refill { remaining: None } => {
                if step.context.selection_active {
                    return Flow::Stay(Stage::Refill { remaining: None });
                }
                step.out.push(Command::BeginVitalsRefill {
                    duration: self.tuning.refill_duration,
                });
                Flow::Next(Stage::Refill {
                    remaining: Some(self.tuning.refill_duration),
                })
            }
            Stage::Refill {
                remaining: Some(remaining),
            } => match wait(remaining, budget) {
                Some(remaining) => Flow::Stay(Stage::Refill {
                    remaining: Some(remaining),
                }),
                None => {
                    step.out.push(Command::EndVitalsRefill);
                    Flow::Next(Stage::Idle)
                }
            },
        }
    }

    fn lock(&self, step: &mut BossStep<'_>) {
        if step.context.collaborators.projectiles {
            step.out.push(Command::FadeProjectiles {
                duration: self.tuning.fade_duration,
            });
        } else {
            warn!("projectile collaborator missing; skipping projectile fade");
        }
        step.out.push(Command::SetSpawningEnabled { enabled: false });
        step.out.push(Command::SetAutoAttackEnabled { enabled: false });
    }

    fn unlock(&self, step: &mut BossStep<'_>) {
        let fraction = self.tuning.cooldown_reduction;
        step.out.push(Command::SetSpawningEnabled { enabled: true });
        step.out.push(Command::SetAutoAttackEnabled { enabled: true });
        step.out.push(Command::ReduceAttackCooldowns { fraction });
        let context = IntervalContext {
            suppressed: false,
            ..self.interval_context(step.scaling)
        };
        step.registry.reset_countdowns(fraction, &context);
    }

    fn adopt_boss(&mut self, template: &CardTemplate) {
        let traits = template.boss.unwrap_or_default();
        self.event.boss_card = Some(template.id);
        self.event.multipliers = traits.multipliers;
        self.event.menace_duration = traits
            .menace_duration
            .unwrap_or(self.tuning.default_menace_duration);
        self.event.death_reward_delay = traits
            .death_reward_delay
            .unwrap_or(self.tuning.default_death_reward_delay);
        info!(
            boss_index = self.event.boss_index,
            card = template.id.get(),
            menace_ms = self.event.menace_duration.as_millis() as u64,
            "boss selected"
        );
    }

    fn spawn_boss(&self, step: &mut BossStep<'_>) {
        let catalog = step.catalog;
        let Some(template) = self.event.boss_card.and_then(|card| catalog.get(card)) else {
            warn!(boss_index = self.event.boss_index, "boss card vanished before spawning");
            return;
        };
        step.out.push(Command::SpawnBoss {
            card: template.id,
            blueprint: template.blueprint,
            position: self.tuning.spawn_position,
            stats: step.scaling.multipliers().combine(self.event.multipliers),
            invulnerable_for: self.event.menace_duration,
        });

        if self.event.boss_index >= self.tuning.camera_growth_limit {
            return;
        }
        if step.context.collaborators.camera {
            step.out.push(Command::GrowCamera {
                increment: self.tuning.camera_growth,
            });
        } else {
            warn!("camera collaborator missing; skipping camera growth");
        }
    }

    fn grant_queued_experience(&mut self, step: &mut BossStep<'_>) {
        let amount = u32::try_from(self.queued_experience).unwrap_or(u32::MAX);
        self.queued_experience = 0;
        if amount > 0 {
            debug!(amount, "granting deferred experience");
            step.out.push(Command::GrantExperience { amount });
        }
    }

    fn register(&self, pick: Pick, step: &mut BossStep<'_>) {
        let catalog = step.catalog;
        let Some(template) = catalog.get(pick.card) else {
            warn!(card = pick.card.get(), "selected card is not in the catalog");
            return;
        };
        let context = self.interval_context(step.scaling);
        let _ = step.registry.register(
            template.clone(),
            pick.rarity,
            pick.interval_override,
            RegistrationPhase::Running,
            &context,
        );
    }

    fn ordinary_offer(
        &self,
        pending: Option<PendingOffer>,
        purpose: OfferPurpose,
        step: &mut BossStep<'_>,
    ) -> OfferProgress {
        if let Some(pending) = pending {
            return match pending.resolve(step.events) {
                Some(pick) => OfferProgress::Picked(pick),
                None => OfferProgress::Waiting(Some(pending)),
            };
        }
        if !step.context.collaborators.selection {
            warn!(?purpose, "selection collaborator missing; skipping card offer");
            return OfferProgress::Skipped;
        }
        if step.context.selection_active {
            return OfferProgress::Waiting(None);
        }

        let catalog = step.catalog;
        let pool = step.registry.unselected(catalog.ordinary());
        let candidates: Vec<CardOffer> = step
            .scheduler
            .draft_offer(
                step.rarity_clock,
                step.rarity_table,
                pool,
                self.ordinary_offer_count,
            )
            .into_iter()
            .map(|drafted| CardOffer {
                card: drafted.template.id,
                rarity: drafted.rarity,
            })
            .collect();
        match issue(purpose, candidates, step) {
            Some(pending) => OfferProgress::Waiting(Some(pending)),
            None => OfferProgress::Skipped,
        }
    }

    fn boss_offer(&self, pending: Option<PendingOffer>, step: &mut BossStep<'_>) -> OfferProgress {
        if let Some(pending) = pending {
            return match pending.resolve(step.events) {
                Some(pick) => OfferProgress::Picked(pick),
                None => OfferProgress::Waiting(Some(pending)),
            };
        }
        if !step.context.collaborators.selection {
            return match step.catalog.bosses().next() {
                Some(template) => {
                    warn!(
                        card = template.id.get(),
                        "selection collaborator missing; picking the first boss"
                    );
                    OfferProgress::Picked(Pick {
                        card: template.id,
                        rarity: Rarity::Boss,
                        interval_override: None,
                    })
                }
                None => OfferProgress::Skipped,
            };
        }
        if step.context.selection_active {
            return OfferProgress::Waiting(None);
        }

        let catalog = step.catalog;
        let candidates: Vec<CardOffer> = step
            .scheduler
            .draft_bosses(catalog.bosses().collect(), self.tuning.offer_count)
            .into_iter()
            .map(|template| CardOffer {
                card: template.id,
                rarity: Rarity::Boss,
            })
            .collect();
        match issue(OfferPurpose::Boss, candidates, step) {
            Some(pending) => OfferProgress::Waiting(Some(pending)),
            None => OfferProgress::Skipped,
        }
    }
}

fn issue(
    purpose: OfferPurpose,
    candidates: Vec<CardOffer>,
    step: &mut BossStep<'_>,
) -> Option<PendingOffer> {
    if candidates.is_empty() {
        warn!(?purpose, "no templates available for card offer");
        return None;
    }
    let offer = step.offers.allocate();
    step.out.push(Command::OfferCards {
        offer,
        purpose,
        candidates: candidates.clone(),
    });
    Some(PendingOffer { offer, candidates })
}

/// Consumes `budget` against `remaining`; `None` once the wait is over.
fn wait(remaining: Duration, budget: &mut Duration) -> Option<Duration> {
    if *budget < remaining {
        let left = remaining - *budget;
        *budget = Duration::ZERO;
        return Some(left);
    }
    *budget -= remaining;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_carries_leftover_budget() {
        let mut budget = Duration::from_millis(1_500);
        assert_eq!(wait(Duration::from_secs(1), &mut budget), None);
        assert_eq!(budget, Duration::from_millis(500));
        assert_eq!(
            wait(Duration::from_secs(1), &mut budget),
            Some(Duration::from_millis(500))
        );
        assert_eq!(budget, Duration::ZERO);
    }

    #[test]
    fn zero_wait_completes_without_budget() {
        let mut budget = Duration::ZERO;
        assert_eq!(wait(Duration::ZERO, &mut budget), None);
    }

    #[test]
    fn every_phase_sets_at_most_one_flag() {
        let phases = [
            BossPhase::Idle,
            BossPhase::AwaitClear,
            BossPhase::FadeAndLockSpawning,
            BossPhase::Buffer,
            BossPhase::PreEventCardSelection,
            BossPhase::BossCardSelection,
            BossPhase::Breather,
            BossPhase::BossSpawn,
            BossPhase::Menace,
            BossPhase::PostMenaceUnlock,
            BossPhase::AwaitBossDeath,
            BossPhase::DeathCleanup,
            BossPhase::ClearRegistry,
            BossPhase::ResumeScalingAndRebase,
            BossPhase::PostEventBonusSelection,
            BossPhase::PostEventCardSelection,
            BossPhase::Refill,
        ];
        for phase in phases {
            assert!(phase.flags().count() <= 1, "{phase:?}");
        }
        assert_eq!(BossPhase::Idle.flags(), PhaseFlags::default());
    }

    #[test]
    fn only_idle_counts_as_no_running_event() {
        assert!(!BossPhase::Idle.is_active());
        for phase in [
            BossPhase::AwaitClear,
            BossPhase::BossCardSelection,
            BossPhase::AwaitBossDeath,
            BossPhase::PostEventCardSelection,
            BossPhase::Refill,
        ] {
            assert!(phase.is_active(), "{phase:?}");
        }
    }
}
