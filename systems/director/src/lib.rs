#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick-driven root of the spawn director.
//!
//! Each call to [`SpawnDirector::handle`] consumes the events the world
//! broadcast since the previous call and answers with commands. Outside boss
//! events the director advances the rarity clock and scaling, offers cards,
//! and fires ready sources. Once the next boss threshold is crossed it hands
//! spawning authority to a [`BossEventOrchestrator`] until that returns to
//! [`BossPhase::Idle`].

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use spawn_director_core::{
    advanced_time, CardCatalog, CardOffer, Command, ConfigError, DirectorConfig, Event,
    HostileStats, OfferId, OfferPurpose, OfferSequence, Placement, Position, SimulationContext,
};
use spawn_director_system_boss_event::{BossEventOrchestrator, BossPhase, BossStep};
use spawn_director_system_rarity::RarityScheduler;
use spawn_director_system_registry::{
    FiredSource, IntervalContext, RegistrationPhase, SourceRegistry,
};
use spawn_director_system_scaling::ScalingState;
use tracing::{debug, info, warn};

const RNG_STREAM_RARITY: &str = "rarity";
const RNG_STREAM_PLACEMENT: &str = "placement";

#[derive(Clone, Debug, PartialEq)]
struct PendingOffer {
    offer: OfferId,
    purpose: OfferPurpose,
    candidates: Vec<CardOffer>,
}

/// Tick-driven spawn director owning every spawning decision of a run.
#[derive(Debug)]
pub struct SpawnDirector {
    config: DirectorConfig,
    catalog: CardCatalog,
    scaling: ScalingState,
    registry: SourceRegistry,
    scheduler: RarityScheduler,
    placement_rng: ChaCha8Rng,
    offers: OfferSequence,
    rarity_clock: Duration,
    boss_index: u32,
    orchestrator: Option<BossEventOrchestrator>,
    pending: Option<PendingOffer>,
    initial_offered: bool,
    next_periodic_offer: Option<Duration>,
}

impl SpawnDirector {
    /// Validates the configuration and catalog and creates a director at the run's origin.
    pub fn new(config: DirectorConfig, catalog: CardCatalog) -> Result<Self, ConfigError> {
        config.validate()?;
        catalog.validate()?;
        if config.spawn_bounds.is_none() {
            warn!("spawn bounds unset; spawn positions will not be clamped");
        }
        if catalog.bosses().next().is_none() {
            warn!("catalog holds no boss templates; boss events will be skipped");
        }
        Ok(Self::build(config, catalog))
    }

    fn build(config: DirectorConfig, catalog: CardCatalog) -> Self {
        Self {
            scaling: ScalingState::new(config.scaling),
            registry: SourceRegistry::new(config.intervals, config.enhancement),
            scheduler: RarityScheduler::new(derive_stream_seed(config.seed, RNG_STREAM_RARITY)),
            placement_rng: ChaCha8Rng::seed_from_u64(derive_stream_seed(
                config.seed,
                RNG_STREAM_PLACEMENT,
            )),
            offers: OfferSequence::new(),
            rarity_clock: Duration::ZERO,
            boss_index: 0,
            orchestrator: None,
            pending: None,
            initial_offered: false,
            next_periodic_offer: config.offers.periodic_interval,
            config,
            catalog,
        }
    }

    /// Consumes world events and emits the commands of one logical frame.
    pub fn handle(
        &mut self,
        events: &[Event],
        context: &SimulationContext,
        out: &mut Vec<Command>,
    ) {
        if events.iter().any(|event| matches!(event, Event::RunReset)) {
            self.reset();
            return;
        }

        let dt = if context.paused {
            Duration::ZERO
        } else {
            advanced_time(events)
        };
        let spawn_dt = if context.selection_active {
            Duration::ZERO
        } else {
            dt
        };

        self.resolve_pending_offer(events);
        if !self.initial_offered {
            self.initial_offered = true;
            self.offer_ordinary(OfferPurpose::Initial, context, out);
        }

        if self.orchestrator.is_none() {
            self.rarity_clock = self.rarity_clock.saturating_add(spawn_dt);
            self.scaling.tick(spawn_dt);
            self.maybe_start_boss_event();
        }
        self.step_boss_event(events, dt, context, out);

        let interval_context = self.interval_context();
        let fired = self.registry.tick(spawn_dt, &interval_context);
        for source in fired {
            self.spawn(&source, context, out);
        }

        self.maybe_offer_periodic(context, out);
    }

    /// Restores every piece of run state to its initial value.
    pub fn reset(&mut self) {
        info!(boss_index = self.boss_index, "run reset");
        let config = self.config.clone();
        let catalog = std::mem::take(&mut self.catalog);
        *self = Self::build(config, catalog);
    }

    fn resolve_pending_offer(&mut self, events: &[Event]) {
        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        let pick = events.iter().find_map(|event| match event {
            Event::CardSelected {
                offer,
                card,
                interval_override,
            } if *offer == pending.offer => pending
                .candidates
                .iter()
                .copied()
                .find(|candidate| candidate.card == *card)
                .map(|candidate| (candidate, *interval_override)),
            _ => None,
        });
        let Some((pick, interval_override)) = pick else {
            return;
        };
        let purpose = pending.purpose;
        self.pending = None;

        let Some(template) = self.catalog.get(pick.card) else {
            warn!(card = pick.card.get(), "selected card is not in the catalog");
            return;
        };
        let phase = if purpose == OfferPurpose::Initial {
            RegistrationPhase::Initial
        } else {
            RegistrationPhase::Running
        };
        let interval_context = self.interval_context();
        let _ = self.registry.register(
            template.clone(),
            pick.rarity,
            interval_override,
            phase,
            &interval_context,
        );
    }

    fn offer_ordinary(
        &mut self,
        purpose: OfferPurpose,
        context: &SimulationContext,
        out: &mut Vec<Command>,
    ) {
        if !context.collaborators.selection {
            warn!(?purpose, "selection collaborator missing; skipping card offer");
            return;
        }
        let pool = self.registry.unselected(self.catalog.ordinary());
        let candidates: Vec<CardOffer> = self
            .scheduler
            .draft_offer(
                self.rarity_clock,
                &self.config.rarity_table,
                pool,
                self.config.offers.offer_count,
            )
            .into_iter()
            .map(|drafted| CardOffer {
                card: drafted.template.id,
                rarity: drafted.rarity,
            })
            .collect();
        if candidates.is_empty() {
            warn!(?purpose, "no templates available for card offer");
            return;
        }

        let offer = self.offers.allocate();
        debug!(offer = offer.get(), ?purpose, "offering cards");
        out.push(Command::OfferCards {
            offer,
            purpose,
            candidates: candidates.clone(),
        });
        self.pending = Some(PendingOffer {
            offer,
            purpose,
            candidates,
        });
    }

    fn maybe_offer_periodic(&mut self, context: &SimulationContext, out: &mut Vec<Command>) {
        let Some(due) = self.next_periodic_offer else {
            return;
        };
        if self.rarity_clock < due
            || self.orchestrator.is_some()
            || self.pending.is_some()
            || context.selection_active
        {
            return;
        }
        self.next_periodic_offer = self
            .config
            .offers
            .periodic_interval
            .map(|interval| due.saturating_add(interval));
        self.offer_ordinary(OfferPurpose::Periodic, context, out);
    }

    fn maybe_start_boss_event(&mut self) {
        let Some(threshold) = self.config.boss.threshold(self.boss_index) else {
            return;
        };
        if self.rarity_clock < threshold {
            return;
        }
        self.scaling.pause();
        self.orchestrator = Some(BossEventOrchestrator::new(
            self.boss_index,
            self.config.boss.clone(),
            self.config.offers.offer_count,
        ));
    }

    fn step_boss_event(
        &mut self,
        events: &[Event],
        dt: Duration,
        context: &SimulationContext,
        out: &mut Vec<Command>,
    ) {
        let Some(orchestrator) = self.orchestrator.as_mut() else {
            return;
        };
        let mut step = BossStep {
            events,
            dt,
            context,
            catalog: &self.catalog,
            scaling: &mut self.scaling,
            registry: &mut self.registry,
            scheduler: &mut self.scheduler,
            rarity_table: &self.config.rarity_table,
            rarity_clock: self.rarity_clock,
            offers: &mut self.offers,
            out,
        };
        if orchestrator.step(&mut step) == BossPhase::Idle {
            self.orchestrator = None;
            self.boss_index = self.boss_index.saturating_add(1);
        }
    }

    fn interval_context(&self) -> IntervalContext {
        match &self.orchestrator {
            Some(orchestrator) => orchestrator.interval_context(&self.scaling),
            None => IntervalContext {
                phase_flat_discount: self.scaling.phase_flat_discount(),
                completed_boss_count: self.scaling.completed_boss_count(),
                boss_event_active: false,
                suppressed: false,
            },
        }
    }

    fn spawn(&mut self, source: &FiredSource, context: &SimulationContext, out: &mut Vec<Command>) {
        let template = &source.template;
        let stats = HostileStats {
            multipliers: self.scaling.multipliers(),
            cooldown_scale: source.cooldown_scale,
            off_camera_speed_scale: source.off_camera_speed_scale,
        };
        for _ in 0..template.placement.count {
            let position = self.place(&template.placement, context.player_position);
            out.push(Command::SpawnHostile {
                card: template.id,
                blueprint: template.blueprint,
                behavior: template.behavior,
                rarity: source.rarity,
                position,
                stats,
            });
        }
    }

    fn place(&mut self, placement: &Placement, origin: Position) -> Position {
        let distance = sample_range(
            &mut self.placement_rng,
            placement.min_distance,
            placement.max_distance,
        );
        let angle = sample_range(
            &mut self.placement_rng,
            placement.min_angle,
            placement.max_angle,
        );
        let position = origin.offset_polar(distance, angle);
        match self.config.spawn_bounds {
            Some(bounds) if bounds.is_valid() => bounds.clamp(position),
            _ => position,
        }
    }

    /// Scaling state of the run.
    #[must_use]
    pub fn scaling(&self) -> &ScalingState {
        &self.scaling
    }

    /// Registered spawn sources.
    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Elapsed time the rarity tables and boss schedule are measured on.
    #[must_use]
    pub const fn rarity_clock(&self) -> Duration {
        self.rarity_clock
    }

    /// Index of the next (or running) boss event.
    #[must_use]
    pub const fn boss_index(&self) -> u32 {
        self.boss_index
    }

    /// Phase of the running boss event, [`BossPhase::Idle`] when none runs.
    #[must_use]
    pub fn boss_phase(&self) -> BossPhase {
        self.orchestrator
            .as_ref()
            .map_or(BossPhase::Idle, BossEventOrchestrator::phase)
    }

    /// Running boss event, if any.
    #[must_use]
    pub const fn boss_event(&self) -> Option<&BossEventOrchestrator> {
        self.orchestrator.as_ref()
    }

    /// Purpose of the ordinary offer awaiting a pick, if any.
    #[must_use]
    pub fn pending_offer(&self) -> Option<OfferPurpose> {
        self.pending.as_ref().map(|pending| pending.purpose)
    }

    /// Templates available for the run.
    #[must_use]
    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }
}

fn sample_range(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Derives the seed of a named random stream from the session seed.
#[must_use]
pub fn derive_stream_seed(seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
