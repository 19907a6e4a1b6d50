#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative headless arena the spawn director plays against.
//!
//! The world stands in for every collaborator the director talks to: entity
//! spawning and liveness, the card-selection widget, the boss health
//! component, player progression, projectiles, camera and vitals. All
//! mutation goes through [`apply`]; observers read through [`query`].

mod vitals;

use std::{collections::VecDeque, time::Duration};

use spawn_director_core::{
    CardId, CardOffer, Collaborators, Command, EntityHandle, Event, HostileStats, OfferId,
    OfferPurpose, Position, Rarity,
};
use tracing::debug;

pub use vitals::Vitals;

/// Tunables of the simulated arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRules {
    /// Experience an ordinary hostile is worth before scaling.
    pub hostile_experience: u32,
    /// Boss health before scaling.
    pub boss_health: f32,
    /// Experience reward carried by the boss.
    pub boss_experience: u32,
    /// Experience needed per level, multiplied by the level being reached.
    pub experience_per_level: u32,
    /// Contact damage per second dealt by each live hostile before scaling.
    pub contact_damage: f32,
    /// Maximum player health.
    pub max_health: f32,
    /// Maximum player mana.
    pub max_mana: f32,
    /// Baseline health regeneration per second.
    pub health_regen: f32,
    /// Baseline mana regeneration per second.
    pub mana_regen: f32,
    /// Starting camera view size.
    pub camera_size: f32,
}

impl Default for WorldRules {
    fn default() -> Self {
        Self {
            hostile_experience: 1,
            boss_health: 500.0,
            boss_experience: 100,
            experience_per_level: 25,
            contact_damage: 0.5,
            max_health: 100.0,
            max_mana: 50.0,
            health_regen: 0.5,
            mana_regen: 1.0,
            camera_size: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Hostile {
    handle: EntityHandle,
    card: CardId,
    rarity: Rarity,
    position: Position,
    stats: HostileStats,
    age: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Boss {
    handle: EntityHandle,
    card: CardId,
    health: f32,
    max_health: f32,
    invulnerable_for: Duration,
}

#[derive(Clone, Debug, PartialEq)]
struct PendingOffer {
    offer: OfferId,
    purpose: OfferPurpose,
    candidates: Vec<CardOffer>,
}

/// Aggregate root holding all arena state.
#[derive(Debug)]
pub struct World {
    rules: WorldRules,
    collaborators: Collaborators,
    paused: bool,
    elapsed: Duration,
    next_handle: u32,
    hostiles: Vec<Hostile>,
    boss: Option<Boss>,
    offers: VecDeque<PendingOffer>,
    level_up_pending: bool,
    experience: u64,
    level: u32,
    spawning_enabled: bool,
    auto_attack_enabled: bool,
    projectile_fade: Option<Duration>,
    projectile_wipes: u32,
    attack_cooldown_scale: f32,
    camera_size: f32,
    vitals: Vitals,
    player_position: Position,
}

impl World {
    /// Creates an arena with every collaborator available.
    #[must_use]
    pub fn new(rules: WorldRules) -> Self {
        Self::with_collaborators(rules, Collaborators::default())
    }

    /// Creates an arena in which only the listed collaborators are reachable.
    #[must_use]
    pub fn with_collaborators(rules: WorldRules, collaborators: Collaborators) -> Self {
        Self {
            rules,
            collaborators,
            paused: false,
            elapsed: Duration::ZERO,
            next_handle: 0,
            hostiles: Vec::new(),
            boss: None,
            offers: VecDeque::new(),
            level_up_pending: false,
            experience: 0,
            level: 1,
            spawning_enabled: true,
            auto_attack_enabled: true,
            projectile_fade: None,
            projectile_wipes: 0,
            attack_cooldown_scale: 1.0,
            camera_size: rules.camera_size,
            vitals: Vitals::new(
                rules.max_health,
                rules.max_mana,
                rules.health_regen,
                rules.mana_regen,
            ),
            player_position: Position::default(),
        }
    }

    fn allocate_handle(&mut self) -> EntityHandle {
        let handle = EntityHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    fn reset(&mut self) {
        *self = Self::with_collaborators(self.rules, self.collaborators);
    }

    fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
        let mut contact = 0.0;
        for hostile in &mut self.hostiles {
            hostile.age = hostile.age.saturating_add(dt);
            contact += self.rules.contact_damage * hostile.stats.multipliers.damage;
        }
        self.vitals.take_damage(contact * dt.as_secs_f32());
        self.vitals.regenerate(dt);

        if let Some(boss) = self.boss.as_mut() {
            boss.invulnerable_for = boss.invulnerable_for.saturating_sub(dt);
        }
        self.projectile_fade = self
            .projectile_fade
            .map(|remaining| remaining.saturating_sub(dt))
            .filter(|remaining| !remaining.is_zero());
    }

    fn hostile_experience(&self, hostile: &Hostile) -> u32 {
        let scaled = self.rules.hostile_experience as f32 * hostile.stats.multipliers.experience;
        scaled.round().max(0.0) as u32
    }

    fn grant_experience(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        self.experience = self.experience.saturating_add(u64::from(amount));
        out_events.push(Event::ExperienceGranted { amount });

        if self.rules.experience_per_level == 0 {
            return;
        }
        loop {
            let next_level = self.level.saturating_add(1);
            if self.experience < cumulative_threshold(self.rules.experience_per_level, next_level) {
                break;
            }
            self.level = next_level;
            self.level_up_pending = true;
            out_events.push(Event::LevelUp { level: next_level });
        }
    }
}

/// Total experience needed to reach `level` from level one.
fn cumulative_threshold(per_level: u32, level: u32) -> u64 {
    let steps = u64::from(level.saturating_sub(1));
    u64::from(per_level) * steps * (steps + 1) / 2
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            let dt = if world.paused { Duration::ZERO } else { dt };
            world.advance(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SetPaused { paused } => {
            if world.paused != paused {
                world.paused = paused;
                out_events.push(Event::PauseChanged { paused });
            }
        }
        Command::SelectCard {
            offer,
            card,
            interval_override,
        } => {
            let Some(front) = world.offers.front() else {
                debug!(offer = offer.get(), "ignoring pick without an open offer");
                return;
            };
            if front.offer != offer || !front.candidates.iter().any(|c| c.card == card) {
                debug!(offer = offer.get(), card = card.get(), "ignoring stale pick");
                return;
            }
            let _ = world.offers.pop_front();
            out_events.push(Event::CardSelected {
                offer,
                card,
                interval_override,
            });
            if let Some(next) = world.offers.front() {
                out_events.push(Event::CardsOffered { offer: next.offer });
            }
        }
        Command::DismissLevelUp => world.level_up_pending = false,
        Command::DamageBoss { amount } => {
            let Some(boss) = world.boss.as_mut() else {
                return;
            };
            if !boss.invulnerable_for.is_zero() || amount <= 0.0 {
                return;
            }
            boss.health -= amount;
            if boss.health <= 0.0 {
                let handle = boss.handle;
                world.boss = None;
                out_events.push(Event::BossDefeated {
                    handle,
                    experience: world.rules.boss_experience,
                });
            }
        }
        Command::DefeatHostile { handle } => {
            let Some(index) = world.hostiles.iter().position(|h| h.handle == handle) else {
                return;
            };
            let hostile = world.hostiles.remove(index);
            let experience = world.hostile_experience(&hostile);
            out_events.push(Event::HostilesDefeated {
                count: 1,
                experience,
                deferred: false,
            });
            world.grant_experience(experience, out_events);
        }
        Command::ResetRun => {
            world.reset();
            out_events.push(Event::RunReset);
        }
        Command::OfferCards {
            offer,
            purpose,
            candidates,
        } => {
            if !world.collaborators.selection {
                debug!(offer = offer.get(), "selection widget unavailable");
                return;
            }
            let shown = world.offers.is_empty();
            world.offers.push_back(PendingOffer {
                offer,
                purpose,
                candidates,
            });
            if shown {
                out_events.push(Event::CardsOffered { offer });
            }
        }
        Command::SpawnHostile {
            card,
            rarity,
            position,
            stats,
            ..
        } => {
            if !world.spawning_enabled {
                debug!(card = card.get(), "spawning locked; hostile dropped");
                return;
            }
            let handle = world.allocate_handle();
            world.hostiles.push(Hostile {
                handle,
                card,
                rarity,
                position,
                stats,
                age: Duration::ZERO,
            });
            out_events.push(Event::HostileSpawned {
                handle,
                card,
                rarity,
            });
        }
        Command::SpawnBoss {
            card,
            stats,
            invulnerable_for,
            ..
        } => {
            let handle = world.allocate_handle();
            let max_health = world.rules.boss_health * stats.health;
            world.boss = Some(Boss {
                handle,
                card,
                health: max_health,
                max_health,
                invulnerable_for,
            });
            out_events.push(Event::BossSpawned { handle, card });
        }
        Command::SetSpawningEnabled { enabled } => world.spawning_enabled = enabled,
        Command::SetAutoAttackEnabled { enabled } => world.auto_attack_enabled = enabled,
        Command::FadeProjectiles { duration } => {
            if world.collaborators.projectiles {
                world.projectile_fade = Some(duration).filter(|fade| !fade.is_zero());
            }
        }
        Command::DestroyProjectiles => {
            if world.collaborators.projectiles {
                world.projectile_fade = None;
                world.projectile_wipes = world.projectile_wipes.saturating_add(1);
            }
        }
        Command::ReduceAttackCooldowns { fraction } => {
            world.attack_cooldown_scale = 1.0 - fraction.clamp(0.0, 1.0);
        }
        Command::GrowCamera { increment } => {
            if world.collaborators.camera {
                world.camera_size += increment;
            }
        }
        Command::MassDefeatHostiles => {
            if world.hostiles.is_empty() {
                return;
            }
            let defeated = std::mem::take(&mut world.hostiles);
            let experience = defeated
                .iter()
                .map(|hostile| world.hostile_experience(hostile))
                .fold(0u32, u32::saturating_add);
            out_events.push(Event::HostilesDefeated {
                count: u32::try_from(defeated.len()).unwrap_or(u32::MAX),
                experience,
                deferred: true,
            });
        }
        Command::GrantExperience { amount } => world.grant_experience(amount, out_events),
        Command::BeginVitalsRefill { duration } => world.vitals.begin_refill(duration),
        Command::EndVitalsRefill => world.vitals.end_refill(),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use spawn_director_core::{
        CardId, CardOffer, EntityHandle, HostileStats, OfferId, OfferPurpose, Position, Rarity,
        SimulationContext,
    };

    use crate::Vitals;

    /// Builds the snapshot the director consumes each frame.
    #[must_use]
    pub fn context(world: &World) -> SimulationContext {
        SimulationContext {
            paused: world.paused,
            selection_active: world.level_up_pending || !world.offers.is_empty(),
            live_hostiles: u32::try_from(world.hostiles.len()).unwrap_or(u32::MAX),
            player_position: world.player_position,
            collaborators: world.collaborators,
        }
    }

    /// Pause-aware simulated time.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Captures every live ordinary hostile in spawn order.
    #[must_use]
    pub fn hostiles(world: &World) -> Vec<HostileSnapshot> {
        world
            .hostiles
            .iter()
            .map(|hostile| HostileSnapshot {
                handle: hostile.handle,
                card: hostile.card,
                rarity: hostile.rarity,
                position: hostile.position,
                stats: hostile.stats,
                age: hostile.age,
            })
            .collect()
    }

    /// Reports whether the entity behind `handle` is still alive.
    #[must_use]
    pub fn is_alive(world: &World, handle: EntityHandle) -> bool {
        world.hostiles.iter().any(|hostile| hostile.handle == handle)
            || world.boss.is_some_and(|boss| boss.handle == handle)
    }

    /// Captures the live boss, if any.
    #[must_use]
    pub fn boss(world: &World) -> Option<BossSnapshot> {
        world.boss.map(|boss| BossSnapshot {
            handle: boss.handle,
            card: boss.card,
            health: boss.health,
            max_health: boss.max_health,
            invulnerable_for: boss.invulnerable_for,
        })
    }

    /// Offer currently shown by the selection widget.
    #[must_use]
    pub fn open_offer(world: &World) -> Option<OfferSnapshot> {
        world.offers.front().map(|offer| OfferSnapshot {
            offer: offer.offer,
            purpose: offer.purpose,
            candidates: offer.candidates.clone(),
        })
    }

    /// Whether a level-up screen awaits dismissal.
    #[must_use]
    pub fn level_up_pending(world: &World) -> bool {
        world.level_up_pending
    }

    /// Player level and accumulated experience.
    #[must_use]
    pub fn progression(world: &World) -> (u32, u64) {
        (world.level, world.experience)
    }

    /// Whether ordinary spawn templates may be instantiated.
    #[must_use]
    pub fn spawning_enabled(world: &World) -> bool {
        world.spawning_enabled
    }

    /// Whether the player's auto-attack is running.
    #[must_use]
    pub fn auto_attack_enabled(world: &World) -> bool {
        world.auto_attack_enabled
    }

    /// Remaining projectile fade, if one is running.
    #[must_use]
    pub fn projectile_fade(world: &World) -> Option<Duration> {
        world.projectile_fade
    }

    /// Number of times every projectile was destroyed.
    #[must_use]
    pub fn projectile_wipes(world: &World) -> u32 {
        world.projectile_wipes
    }

    /// Multiplier applied to tracked attack cooldowns.
    #[must_use]
    pub fn attack_cooldown_scale(world: &World) -> f32 {
        world.attack_cooldown_scale
    }

    /// Current camera view size.
    #[must_use]
    pub fn camera_size(world: &World) -> f32 {
        world.camera_size
    }

    /// Player health and mana.
    #[must_use]
    pub fn vitals(world: &World) -> Vitals {
        world.vitals
    }

    /// Read-only representation of a live ordinary hostile.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct HostileSnapshot {
        /// Handle of the hostile.
        pub handle: EntityHandle,
        /// Card whose source produced it.
        pub card: CardId,
        /// Rarity it was tagged with.
        pub rarity: Rarity,
        /// Spawn position.
        pub position: Position,
        /// Stats it spawned with.
        pub stats: HostileStats,
        /// Time it has been alive.
        pub age: Duration,
    }

    /// Read-only representation of the live boss.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct BossSnapshot {
        /// Handle of the boss.
        pub handle: EntityHandle,
        /// Boss card it was built from.
        pub card: CardId,
        /// Remaining health.
        pub health: f32,
        /// Health at spawn.
        pub max_health: f32,
        /// Remaining invulnerability.
        pub invulnerable_for: Duration,
    }

    /// Read-only representation of the offer on screen.
    #[derive(Clone, Debug, PartialEq)]
    pub struct OfferSnapshot {
        /// Identifier picks must echo.
        pub offer: OfferId,
        /// Run phase the offer was made for.
        pub purpose: OfferPurpose,
        /// Choices on offer.
        pub candidates: Vec<CardOffer>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawn_director_core::{BehaviorKind, BlueprintId, StatMultipliers};

    fn spawn_hostile(world: &mut World, events: &mut Vec<Event>) -> EntityHandle {
        apply(
            world,
            Command::SpawnHostile {
                card: CardId::new(1),
                blueprint: BlueprintId::new(1),
                behavior: BehaviorKind::Chaser,
                rarity: Rarity::Common,
                position: Position::new(10.0, 0.0),
                stats: HostileStats::plain(StatMultipliers::IDENTITY),
            },
            events,
        );
        match events.last() {
            Some(Event::HostileSpawned { handle, .. }) => *handle,
            other => panic!("expected spawn confirmation, got {other:?}"),
        }
    }

    #[test]
    fn paused_ticks_advance_zero_time() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        apply(&mut world, Command::SetPaused { paused: true }, &mut events);
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::PauseChanged { paused: true },
                Event::TimeAdvanced { dt: Duration::ZERO },
            ]
        );
        assert!(query::context(&world).paused);
    }

    #[test]
    fn locked_spawning_drops_ordinary_hostiles() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetSpawningEnabled { enabled: false },
            &mut events,
        );
        apply(
            &mut world,
            Command::SpawnHostile {
                card: CardId::new(1),
                blueprint: BlueprintId::new(1),
                behavior: BehaviorKind::Chaser,
                rarity: Rarity::Common,
                position: Position::default(),
                stats: HostileStats::plain(StatMultipliers::IDENTITY),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::context(&world).live_hostiles, 0);
    }

    #[test]
    fn normal_kills_grant_experience_and_mass_kills_defer_it() {
        let rules = WorldRules {
            hostile_experience: 5,
            ..WorldRules::default()
        };
        let mut world = World::new(rules);
        let mut events = Vec::new();
        let first = spawn_hostile(&mut world, &mut events);
        let _ = spawn_hostile(&mut world, &mut events);
        let _ = spawn_hostile(&mut world, &mut events);
        events.clear();

        apply(&mut world, Command::DefeatHostile { handle: first }, &mut events);
        assert_eq!(
            events[..2],
            [
                Event::HostilesDefeated {
                    count: 1,
                    experience: 5,
                    deferred: false
                },
                Event::ExperienceGranted { amount: 5 },
            ]
        );
        events.clear();

        apply(&mut world, Command::MassDefeatHostiles, &mut events);
        assert_eq!(
            events,
            vec![Event::HostilesDefeated {
                count: 2,
                experience: 10,
                deferred: true
            }]
        );
        assert_eq!(query::progression(&world), (1, 5));
        assert!(!query::is_alive(&world, first));
    }

    #[test]
    fn boss_ignores_damage_while_invulnerable_and_dies_once() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnBoss {
                card: CardId::new(90),
                blueprint: BlueprintId::new(500),
                position: Position::default(),
                stats: StatMultipliers::new(0.2, 1.0, 1.0),
                invulnerable_for: Duration::from_secs(2),
            },
            &mut events,
        );
        apply(&mut world, Command::DamageBoss { amount: 1_000.0 }, &mut events);
        assert!(query::boss(&world).is_some());

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(2),
            },
            &mut events,
        );
        events.clear();
        apply(&mut world, Command::DamageBoss { amount: 60.0 }, &mut events);
        apply(&mut world, Command::DamageBoss { amount: 60.0 }, &mut events);
        apply(&mut world, Command::DamageBoss { amount: 60.0 }, &mut events);
        let deaths = events
            .iter()
            .filter(|event| matches!(event, Event::BossDefeated { .. }))
            .count();
        assert_eq!(deaths, 1);
        assert!(query::boss(&world).is_none());
    }

    #[test]
    fn offers_queue_and_reject_stale_picks() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        let candidates = vec![CardOffer {
            card: CardId::new(3),
            rarity: Rarity::Rare,
        }];
        for id in 0..2 {
            apply(
                &mut world,
                Command::OfferCards {
                    offer: OfferId::new(id),
                    purpose: OfferPurpose::Periodic,
                    candidates: candidates.clone(),
                },
                &mut events,
            );
        }
        assert_eq!(events, vec![Event::CardsOffered { offer: OfferId::new(0) }]);
        events.clear();

        apply(
            &mut world,
            Command::SelectCard {
                offer: OfferId::new(1),
                card: CardId::new(3),
                interval_override: None,
            },
            &mut events,
        );
        assert!(events.is_empty(), "only the offer on screen can be answered");

        apply(
            &mut world,
            Command::SelectCard {
                offer: OfferId::new(0),
                card: CardId::new(3),
                interval_override: Some(Duration::from_secs(2)),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::CardSelected {
                    offer: OfferId::new(0),
                    card: CardId::new(3),
                    interval_override: Some(Duration::from_secs(2)),
                },
                Event::CardsOffered {
                    offer: OfferId::new(1)
                },
            ]
        );
        assert!(query::context(&world).selection_active);
    }

    #[test]
    fn experience_levels_up_and_blocks_selection_until_dismissed() {
        let rules = WorldRules {
            experience_per_level: 10,
            ..WorldRules::default()
        };
        let mut world = World::new(rules);
        let mut events = Vec::new();

        apply(&mut world, Command::GrantExperience { amount: 35 }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::ExperienceGranted { amount: 35 },
                Event::LevelUp { level: 2 },
                Event::LevelUp { level: 3 },
            ]
        );
        assert!(query::context(&world).selection_active);
        apply(&mut world, Command::DismissLevelUp, &mut events);
        assert!(!query::context(&world).selection_active);
    }

    #[test]
    fn refill_restores_vitals_and_regeneration_rates() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        for _ in 0..4 {
            let _ = spawn_hostile(&mut world, &mut events);
        }
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(10),
            },
            &mut events,
        );
        let hurt = query::vitals(&world);
        assert!(hurt.health() < hurt.max_health());

        apply(&mut world, Command::MassDefeatHostiles, &mut events);
        apply(
            &mut world,
            Command::BeginVitalsRefill {
                duration: Duration::from_secs(2),
            },
            &mut events,
        );
        assert!(query::vitals(&world).is_refilling());
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(2),
            },
            &mut events,
        );
        apply(&mut world, Command::EndVitalsRefill, &mut events);

        let refilled = query::vitals(&world);
        assert_eq!(refilled.health(), refilled.max_health());
        assert!(!refilled.is_refilling());
        assert_eq!(refilled.health_regen(), WorldRules::default().health_regen);
    }

    #[test]
    fn reset_restores_a_fresh_arena() {
        let mut world = World::new(WorldRules::default());
        let mut events = Vec::new();
        let _ = spawn_hostile(&mut world, &mut events);
        apply(&mut world, Command::GrowCamera { increment: 0.5 }, &mut events);
        events.clear();

        apply(&mut world, Command::ResetRun, &mut events);

        assert_eq!(events, vec![Event::RunReset]);
        assert_eq!(query::context(&world).live_hostiles, 0);
        assert_eq!(query::camera_size(&world), 1.0);
    }
}
