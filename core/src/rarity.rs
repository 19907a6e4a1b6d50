//! Rarity tiers and the time-varying weight table that drives rarity draws.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ordered rarity tiers. `Boss` tags boss entities and boss-tier cards and is
/// never produced by a weighted draw.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Lowest tier.
    Common,
    /// Second tier.
    Uncommon,
    /// Third tier.
    Rare,
    /// Fourth tier.
    Epic,
    /// Fifth tier.
    Legendary,
    /// Highest drawable tier.
    Mythic,
    /// Tag reserved for bosses.
    Boss,
}

impl Rarity {
    /// The six drawable tiers in ascending order.
    pub const TIERS: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
    ];

    /// Position of the tier inside [`Rarity::TIERS`]; `None` for `Boss`.
    #[must_use]
    pub const fn tier_index(self) -> Option<usize> {
        match self {
            Rarity::Common => Some(0),
            Rarity::Uncommon => Some(1),
            Rarity::Rare => Some(2),
            Rarity::Epic => Some(3),
            Rarity::Legendary => Some(4),
            Rarity::Mythic => Some(5),
            Rarity::Boss => None,
        }
    }

    /// Reports whether this is the boss tag.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Rarity::Boss)
    }
}

/// Weight per drawable tier for one row of the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityWeights {
    /// Weight of [`Rarity::Common`].
    pub common: u32,
    /// Weight of [`Rarity::Uncommon`].
    pub uncommon: u32,
    /// Weight of [`Rarity::Rare`].
    pub rare: u32,
    /// Weight of [`Rarity::Epic`].
    pub epic: u32,
    /// Weight of [`Rarity::Legendary`].
    pub legendary: u32,
    /// Weight of [`Rarity::Mythic`].
    pub mythic: u32,
}

impl RarityWeights {
    /// Creates weights from an array ordered like [`Rarity::TIERS`].
    #[must_use]
    pub const fn from_array(weights: [u32; 6]) -> Self {
        Self {
            common: weights[0],
            uncommon: weights[1],
            rare: weights[2],
            epic: weights[3],
            legendary: weights[4],
            mythic: weights[5],
        }
    }

    /// Weight configured for a tier; the boss tag always weighs zero.
    #[must_use]
    pub const fn get(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
            Rarity::Mythic => self.mythic,
            Rarity::Boss => 0,
        }
    }

    /// Sum of every tier weight.
    #[must_use]
    pub fn total(&self) -> u64 {
        Rarity::TIERS
            .iter()
            .map(|rarity| u64::from(self.get(*rarity)))
            .sum()
    }
}

/// One row of the weight table, active up to and including `until`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarityWeightRow {
    /// Inclusive upper bound of the rarity clock; `None` means unbounded.
    #[serde(
        default,
        with = "crate::seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub until: Option<Duration>,
    /// Weights used while the row is active.
    pub weights: RarityWeights,
}

impl RarityWeightRow {
    /// Creates a row bounded at `until`.
    #[must_use]
    pub const fn until(until: Duration, weights: RarityWeights) -> Self {
        Self {
            until: Some(until),
            weights,
        }
    }

    /// Creates the unbounded catch-all row.
    #[must_use]
    pub const fn unbounded(weights: RarityWeights) -> Self {
        Self {
            until: None,
            weights,
        }
    }
}

/// Ordered rows mapping rarity-clock values to tier weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RarityWeightTable {
    rows: Vec<RarityWeightRow>,
}

impl RarityWeightTable {
    /// Creates a table from rows ordered by ascending bound.
    #[must_use]
    pub fn new(rows: Vec<RarityWeightRow>) -> Self {
        Self { rows }
    }

    /// Rows in evaluation order.
    #[must_use]
    pub fn rows(&self) -> &[RarityWeightRow] {
        &self.rows
    }

    /// Weights of the first row whose bound is at or above `clock`, else the last row.
    ///
    /// An empty table yields all-zero weights, which every consumer treats as
    /// "draw the lowest tier".
    #[must_use]
    pub fn active(&self, clock: Duration) -> RarityWeights {
        self.rows
            .iter()
            .find(|row| row.until.map_or(true, |until| until >= clock))
            .or_else(|| self.rows.last())
            .map(|row| row.weights)
            .unwrap_or_default()
    }
}

impl Default for RarityWeightTable {
    fn default() -> Self {
        Self::new(vec![
            RarityWeightRow::until(
                Duration::from_secs(120),
                RarityWeights::from_array([80, 20, 0, 0, 0, 0]),
            ),
            RarityWeightRow::until(
                Duration::from_secs(360),
                RarityWeights::from_array([55, 30, 12, 3, 0, 0]),
            ),
            RarityWeightRow::until(
                Duration::from_secs(720),
                RarityWeights::from_array([35, 32, 20, 9, 3, 1]),
            ),
            RarityWeightRow::unbounded(RarityWeights::from_array([20, 28, 26, 15, 8, 3])),
        ])
    }
}
