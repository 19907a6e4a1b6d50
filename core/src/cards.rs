//! Immutable card templates and the catalog they are loaded into.

use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{BlueprintId, CardId, ConfigError, Rarity, StatMultipliers};

/// Behaviour family of the entity a card instantiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Walks straight at the player.
    Chaser,
    /// Keeps distance and shoots.
    Ranged,
    /// Winds up and dashes.
    Charger,
    /// Arrives in packs.
    Swarm,
    /// Conjures minions.
    Summoner,
}

/// Where around the player a source places its spawns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Entities produced per fire.
    pub count: u32,
    /// Inner radius of the spawn ring.
    pub min_distance: f32,
    /// Outer radius of the spawn ring.
    pub max_distance: f32,
    /// Start of the angular sector, in degrees.
    pub min_angle: f32,
    /// End of the angular sector, in degrees.
    pub max_angle: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            count: 1,
            min_distance: 800.0,
            max_distance: 1_200.0,
            min_angle: 0.0,
            max_angle: 360.0,
        }
    }
}

/// Extra data carried by boss cards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTraits {
    /// Per-event multipliers stacked on top of global scaling.
    pub multipliers: StatMultipliers,
    /// Invulnerability window after spawning; falls back to the director default.
    #[serde(with = "crate::seconds::option", skip_serializing_if = "Option::is_none")]
    pub menace_duration: Option<Duration>,
    /// Delay before deferred experience is granted; falls back to the director default.
    #[serde(with = "crate::seconds::option", skip_serializing_if = "Option::is_none")]
    pub death_reward_delay: Option<Duration>,
}

/// Immutable spawn template a player can select.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardTemplate {
    /// Identifier of the card.
    pub id: CardId,
    /// Base rarity of the card.
    pub rarity: Rarity,
    /// Configured time between fires.
    #[serde(with = "crate::seconds")]
    pub spawn_interval: Duration,
    /// Entity blueprint instantiated when the source fires.
    pub blueprint: BlueprintId,
    /// Behaviour family of the instantiated entity.
    pub behavior: BehaviorKind,
    /// Angle and distance rules for spawn positions.
    #[serde(default)]
    pub placement: Placement,
    /// Present only on cards offered during boss card selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss: Option<BossTraits>,
}

impl CardTemplate {
    /// Creates an ordinary card with default placement.
    #[must_use]
    pub fn new(
        id: CardId,
        rarity: Rarity,
        spawn_interval: Duration,
        blueprint: BlueprintId,
        behavior: BehaviorKind,
    ) -> Self {
        Self {
            id,
            rarity,
            spawn_interval,
            blueprint,
            behavior,
            placement: Placement::default(),
            boss: None,
        }
    }

    /// Turns the card into a boss card carrying the provided traits.
    #[must_use]
    pub fn with_boss_traits(mut self, traits: BossTraits) -> Self {
        self.rarity = Rarity::Boss;
        self.boss = Some(traits);
        self
    }

    /// Replaces the placement rules.
    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Reports whether the card belongs to the boss tier.
    #[must_use]
    pub const fn is_boss_tier(&self) -> bool {
        self.rarity.is_boss()
    }
}

/// Set of templates available for the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardCatalog {
    #[serde(default)]
    cards: Vec<CardTemplate>,
}

impl CardCatalog {
    /// Creates a catalog from templates.
    #[must_use]
    pub fn new(cards: Vec<CardTemplate>) -> Self {
        Self { cards }
    }

    /// Parses and validates a catalog made of `[[cards]]` tables.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let catalog: Self = toml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks identifier uniqueness and per-card invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for card in &self.cards {
            if !seen.insert(card.id) {
                return Err(ConfigError::DuplicateCard(card.id.get()));
            }
            if card.spawn_interval.is_zero() && card.boss.is_none() {
                return Err(ConfigError::ZeroSpawnInterval(card.id.get()));
            }
            if card.boss.is_some() && !card.is_boss_tier() {
                return Err(ConfigError::BossTraitsOnOrdinaryCard(card.id.get()));
            }
        }
        Ok(())
    }

    /// Every template in declaration order.
    #[must_use]
    pub fn cards(&self) -> &[CardTemplate] {
        &self.cards
    }

    /// Looks up a template by identifier.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&CardTemplate> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Templates that may be offered during ordinary selections.
    pub fn ordinary(&self) -> impl Iterator<Item = &CardTemplate> {
        self.cards.iter().filter(|card| card.boss.is_none())
    }

    /// Templates that may be offered during boss card selection.
    pub fn bosses(&self) -> impl Iterator<Item = &CardTemplate> {
        self.cards.iter().filter(|card| card.boss.is_some())
    }
}
