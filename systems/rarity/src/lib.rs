#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rarity-weighted selection of spawn templates.
//!
//! Draws pick a tier by cumulative-weight roulette over the active table row,
//! then pick a template of that tier. When the requested tier has no template
//! the search walks the remaining tiers in a fixed fallback order that never
//! prefers a lower tier over an available higher one.

use std::time::Duration;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spawn_director_core::{CardTemplate, Rarity, RarityWeightTable, RarityWeights};
use tracing::warn;

/// Template drafted into an offer together with the rarity it resolves to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drafted<'a> {
    /// Template on offer.
    pub template: &'a CardTemplate,
    /// Rarity the source registers at.
    pub rarity: Rarity,
}

/// Seeded scheduler performing rarity draws.
#[derive(Debug)]
pub struct RarityScheduler {
    rng: ChaCha8Rng,
}

impl RarityScheduler {
    /// Creates a scheduler whose draws replay exactly for a given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draws a rarity from the table row active at `clock`.
    pub fn select_rarity(&mut self, clock: Duration, table: &RarityWeightTable) -> Rarity {
        let weights = active_weights(clock, table);
        let total = weights.total();
        if total == 0 {
            return Rarity::Common;
        }
        roll_rarity(&weights, self.rng.gen_range(0..total))
    }

    /// Picks a template for `requested`, walking [`fallback_order`] until a tier has one.
    ///
    /// Returns `None` only when `pool` is empty.
    pub fn pick_template<'a>(
        &mut self,
        requested: Rarity,
        weights: &RarityWeights,
        pool: &[&'a CardTemplate],
    ) -> Option<&'a CardTemplate> {
        for rarity in fallback_order(requested, weights) {
            let candidates: Vec<&'a CardTemplate> = pool
                .iter()
                .copied()
                .filter(|template| template.rarity == rarity)
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let index = self.rng.gen_range(0..candidates.len());
            return Some(candidates[index]);
        }
        None
    }

    /// Drafts up to `count` distinct templates from `pool` for a single offer.
    ///
    /// Each slot draws its own rarity. A template picked below the drawn tier
    /// is offered as an enhanced variant at the drawn tier; one picked above it
    /// keeps its own rarity.
    pub fn draft_offer<'a>(
        &mut self,
        clock: Duration,
        table: &RarityWeightTable,
        pool: Vec<&'a CardTemplate>,
        count: usize,
    ) -> Vec<Drafted<'a>> {
        let mut remaining = pool;
        let mut drafted = Vec::with_capacity(count.min(remaining.len()));
        if remaining.is_empty() {
            warn!("card offer requested from an empty template pool");
            return drafted;
        }

        let weights = active_weights(clock, table);
        for _ in 0..count {
            let requested = self.select_rarity(clock, table);
            let Some(template) = self.pick_template(requested, &weights, &remaining) else {
                break;
            };
            remaining.retain(|candidate| candidate.id != template.id);
            drafted.push(Drafted {
                template,
                rarity: requested.max(template.rarity),
            });
        }
        drafted
    }

    /// Draws up to `count` distinct boss templates in random order.
    ///
    /// Boss cards sit outside the weighted tiers, so they are sampled uniformly.
    pub fn draft_bosses<'a>(
        &mut self,
        pool: Vec<&'a CardTemplate>,
        count: usize,
    ) -> Vec<&'a CardTemplate> {
        if pool.is_empty() {
            warn!("boss offer requested without boss templates");
            return Vec::new();
        }
        pool.choose_multiple(&mut self.rng, count)
            .copied()
            .collect()
    }
}

/// Weights of the table row active at `clock`.
#[must_use]
pub fn active_weights(clock: Duration, table: &RarityWeightTable) -> RarityWeights {
    table.active(clock)
}

/// Maps a roll in `0..weights.total()` onto a tier by cumulative weight.
///
/// Rolls at or beyond the total, including any roll against an all-zero row,
/// resolve to the lowest tier.
#[must_use]
pub fn roll_rarity(weights: &RarityWeights, roll: u64) -> Rarity {
    let mut cumulative = 0u64;
    for rarity in Rarity::TIERS {
        cumulative += u64::from(weights.get(rarity));
        if roll < cumulative {
            return rarity;
        }
    }
    Rarity::Common
}

/// Order in which tiers are searched when picking a template for `requested`.
///
/// 1. `requested` and higher tiers with nonzero weight, ascending.
/// 2. `requested` and higher tiers with zero weight, ascending.
/// 3. Lower tiers, nearest first.
///
/// The boss tag is treated as the highest tier and only ever yields itself.
#[must_use]
pub fn fallback_order(requested: Rarity, weights: &RarityWeights) -> Vec<Rarity> {
    let Some(start) = requested.tier_index() else {
        return vec![Rarity::Boss];
    };

    let (lower, upper) = Rarity::TIERS.split_at(start);
    let mut order: Vec<Rarity> = upper
        .iter()
        .copied()
        .filter(|rarity| weights.get(*rarity) > 0)
        .collect();
    order.extend(
        upper
            .iter()
            .copied()
            .filter(|rarity| weights.get(*rarity) == 0),
    );
    order.extend(lower.iter().rev().copied());
    order
}
