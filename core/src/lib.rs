#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the spawn director.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams together with a
//! [`SimulationContext`] snapshot and respond exclusively with new command
//! batches. No system reads ambient global state; everything it may depend on
//! arrives through the context.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod cards;
mod config;
mod rarity;
mod seconds;

pub use cards::{BehaviorKind, BossTraits, CardCatalog, CardTemplate, Placement};
pub use config::{
    BossTuning, ConfigError, DirectorConfig, EnhancementTuning, IntervalTuning, OfferTuning,
    ScalingTuning, StepMode, StepTuning,
};
pub use rarity::{Rarity, RarityWeightRow, RarityWeightTable, RarityWeights};

/// Commands that express all permissible world mutations and collaborator requests.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of wall time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Enters or leaves the global pause state.
    SetPaused {
        /// Whether the session should be paused.
        paused: bool,
    },
    /// Player pick answering a previously issued card offer.
    SelectCard {
        /// Offer the pick answers.
        offer: OfferId,
        /// Card chosen by the player.
        card: CardId,
        /// Run-specific spawn interval replacing the card's base interval.
        interval_override: Option<Duration>,
    },
    /// Dismisses a pending level-up screen.
    DismissLevelUp,
    /// Applies damage to the active boss.
    DamageBoss {
        /// Health removed from the boss.
        amount: f32,
    },
    /// Defeats a single ordinary hostile through normal combat.
    DefeatHostile {
        /// Handle of the hostile that was defeated.
        handle: EntityHandle,
    },
    /// Tears the run down to its initial state (player death or restart).
    ResetRun,
    /// Presents a set of card choices to the selection collaborator.
    OfferCards {
        /// Identifier the eventual pick must echo back.
        offer: OfferId,
        /// Run phase on whose behalf the offer is made.
        purpose: OfferPurpose,
        /// Choices presented to the player.
        candidates: Vec<CardOffer>,
    },
    /// Instantiates an ordinary hostile from a spawn template.
    SpawnHostile {
        /// Card whose source fired.
        card: CardId,
        /// Entity blueprint to instantiate.
        blueprint: BlueprintId,
        /// Behaviour kind of the instantiated entity.
        behavior: BehaviorKind,
        /// Resolved rarity of the source for this run.
        rarity: Rarity,
        /// World position at which the hostile appears.
        position: Position,
        /// Scaled stats applied to the new entity.
        stats: HostileStats,
    },
    /// Instantiates the boss of the current boss event.
    SpawnBoss {
        /// Boss card selected for the event.
        card: CardId,
        /// Entity blueprint to instantiate.
        blueprint: BlueprintId,
        /// Fixed arena position of the boss.
        position: Position,
        /// Combined scaling and per-event multipliers.
        stats: StatMultipliers,
        /// Length of the damage immunity window.
        invulnerable_for: Duration,
    },
    /// Enables or disables instantiation of ordinary spawn templates.
    SetSpawningEnabled {
        /// Whether ordinary spawns may be instantiated.
        enabled: bool,
    },
    /// Enables or disables the player's auto-attack.
    SetAutoAttackEnabled {
        /// Whether auto-attack is active.
        enabled: bool,
    },
    /// Starts fading every active player projectile.
    FadeProjectiles {
        /// Length of the fade.
        duration: Duration,
    },
    /// Destroys every active player projectile.
    DestroyProjectiles,
    /// Resets tracked attack cooldowns and shortens them by a fraction.
    ReduceAttackCooldowns {
        /// Fraction removed from each cooldown, in `[0, 1]`.
        fraction: f32,
    },
    /// Grows the camera view by a fixed increment.
    GrowCamera {
        /// Increment added to the view size.
        increment: f32,
    },
    /// Instantly defeats every remaining ordinary hostile without granting experience.
    MassDefeatHostiles,
    /// Grants experience that was deferred by the director.
    GrantExperience {
        /// Experience awarded.
        amount: u32,
    },
    /// Temporarily boosts regeneration so health and mana refill over time.
    BeginVitalsRefill {
        /// Time over which vitals should reach their maximum.
        duration: Duration,
    },
    /// Restores the regeneration rates saved by [`Command::BeginVitalsRefill`].
    EndVitalsRefill,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced. `dt` is zero while paused.
    TimeAdvanced {
        /// Pause-aware duration of simulated time.
        dt: Duration,
    },
    /// Announces that the global pause state changed.
    PauseChanged {
        /// Pause state after processing.
        paused: bool,
    },
    /// Confirms that an offer is on screen.
    CardsOffered {
        /// Offer that became active.
        offer: OfferId,
    },
    /// Reports the player's pick for an offer.
    CardSelected {
        /// Offer that was answered.
        offer: OfferId,
        /// Card the player chose.
        card: CardId,
        /// Spawn interval chosen together with the card, if any.
        interval_override: Option<Duration>,
    },
    /// Confirms that an ordinary hostile entered the arena.
    HostileSpawned {
        /// Handle allocated for the hostile.
        handle: EntityHandle,
        /// Card whose source produced the hostile.
        card: CardId,
        /// Rarity the hostile was tagged with.
        rarity: Rarity,
    },
    /// Confirms that the boss entered the arena.
    BossSpawned {
        /// Handle allocated for the boss.
        handle: EntityHandle,
        /// Boss card the entity was built from.
        card: CardId,
    },
    /// Reports that ordinary hostiles were defeated.
    HostilesDefeated {
        /// Number of hostiles removed.
        count: u32,
        /// Experience those hostiles are worth.
        experience: u32,
        /// Whether the world withheld the experience for the director to grant later.
        deferred: bool,
    },
    /// One-shot signal raised by the boss health component when it reaches zero.
    BossDefeated {
        /// Handle of the defeated boss.
        handle: EntityHandle,
        /// Experience reward carried by the boss. Never granted by the world.
        experience: u32,
    },
    /// Confirms that experience was added to the player.
    ExperienceGranted {
        /// Experience added.
        amount: u32,
    },
    /// Announces that the player levelled up and a level-up screen is pending.
    LevelUp {
        /// Level reached.
        level: u32,
    },
    /// Announces that the run was reset to its initial state.
    RunReset,
}

/// Unique identifier assigned to a card template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(u32);

impl CardId {
    /// Creates a new card identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of the entity blueprint a card instantiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlueprintId(u32);

impl BlueprintId {
    /// Creates a new blueprint identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle the world allocates for every spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u32);

impl EntityHandle {
    /// Creates a new entity handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier tying a card pick to the offer it answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OfferId(u32);

impl OfferId {
    /// Creates a new offer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Monotonic allocator for [`OfferId`] values shared by every offer issuer.
#[derive(Clone, Debug, Default)]
pub struct OfferSequence {
    next: u32,
}

impl OfferSequence {
    /// Creates a sequence that starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next offer identifier.
    pub fn allocate(&mut self) -> OfferId {
        let offer = OfferId::new(self.next);
        self.next = self.next.wrapping_add(1);
        offer
    }
}

/// Run phase on whose behalf a card offer is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OfferPurpose {
    /// Selection that opens the run.
    Initial,
    /// Recurring selection between boss events.
    Periodic,
    /// Optional selection before the boss card is chosen.
    PreBoss,
    /// Choice of the boss for the current event.
    Boss,
    /// Optional extra selection after the boss is defeated.
    PostBossBonus,
    /// Mandatory selection that repopulates the registry after a boss event.
    PostBoss,
}

/// Single choice presented in a card offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CardOffer {
    /// Card on offer.
    pub card: CardId,
    /// Rarity the card would be registered at.
    pub rarity: Rarity,
}

/// Point in arena space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Offsets the position by a polar displacement expressed in degrees.
    #[must_use]
    pub fn offset_polar(self, distance: f32, angle_degrees: f32) -> Self {
        let radians = angle_degrees.to_radians();
        Self::new(
            self.x + distance * radians.cos(),
            self.y + distance * radians.sin(),
        )
    }
}

/// Axis-aligned rectangle that spawn positions are clamped into.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: Position,
    /// Upper-right corner.
    pub max: Position,
}

impl Bounds {
    /// Creates bounds from two corners.
    #[must_use]
    pub const fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// Reports whether the rectangle encloses a non-empty area.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }

    /// Clamps a position into the rectangle.
    #[must_use]
    pub fn clamp(&self, position: Position) -> Position {
        Position::new(
            position.x.clamp(self.min.x, self.max.x),
            position.y.clamp(self.min.y, self.max.y),
        )
    }
}

/// Health, experience, and damage multipliers applied to a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatMultipliers {
    /// Health multiplier.
    pub health: f32,
    /// Experience reward multiplier.
    pub experience: f32,
    /// Damage multiplier.
    pub damage: f32,
}

impl StatMultipliers {
    /// Multipliers that leave every stat unchanged.
    pub const IDENTITY: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new multiplier triple.
    #[must_use]
    pub const fn new(health: f32, experience: f32, damage: f32) -> Self {
        Self {
            health,
            experience,
            damage,
        }
    }

    /// Component-wise product of two multiplier triples.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self::new(
            self.health * other.health,
            self.experience * other.experience,
            self.damage * other.damage,
        )
    }
}

impl Default for StatMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Stats attached to an ordinary hostile when its source fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostileStats {
    /// Scaling multipliers in effect when the source fired.
    pub multipliers: StatMultipliers,
    /// Scale applied to the entity's ability cooldown; below one for enhanced variants.
    pub cooldown_scale: f32,
    /// Scale applied to the entity's off-camera movement speed.
    pub off_camera_speed_scale: f32,
}

impl HostileStats {
    /// Creates stats with neutral cooldown and speed scales.
    #[must_use]
    pub const fn plain(multipliers: StatMultipliers) -> Self {
        Self {
            multipliers,
            cooldown_scale: 1.0,
            off_camera_speed_scale: 1.0,
        }
    }
}

/// Availability of the external collaborators the director calls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collaborators {
    /// Card-selection widget.
    pub selection: bool,
    /// Camera controller.
    pub camera: bool,
    /// Player projectile manager.
    pub projectiles: bool,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            selection: true,
            camera: true,
            projectiles: true,
        }
    }
}

/// Per-tick snapshot of everything outside the director that it may consult.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationContext {
    /// Whether the game is globally paused.
    pub paused: bool,
    /// Whether a card offer or level-up screen is on screen.
    pub selection_active: bool,
    /// Number of ordinary (non-boss) hostiles currently alive.
    pub live_hostiles: u32,
    /// Position spawn placement rules are measured from.
    pub player_position: Position,
    /// Collaborators that are currently reachable.
    pub collaborators: Collaborators,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self {
            paused: false,
            selection_active: false,
            live_hostiles: 0,
            player_position: Position::default(),
            collaborators: Collaborators::default(),
        }
    }
}

/// Sums every `TimeAdvanced` delta contained in an event batch.
#[must_use]
pub fn advanced_time(events: &[Event]) -> Duration {
    events
        .iter()
        .filter_map(|event| match event {
            Event::TimeAdvanced { dt } => Some(*dt),
            _ => None,
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}
