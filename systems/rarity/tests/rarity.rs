use std::time::Duration;

use spawn_director_core::{
    BehaviorKind, BlueprintId, CardId, CardTemplate, Rarity, RarityWeightRow, RarityWeightTable,
    RarityWeights,
};
use spawn_director_system_rarity::{fallback_order, RarityScheduler};

fn card(id: u32, rarity: Rarity) -> CardTemplate {
    CardTemplate::new(
        CardId::new(id),
        rarity,
        Duration::from_secs(5),
        BlueprintId::new(id),
        BehaviorKind::Chaser,
    )
}

fn scenario_table() -> RarityWeightTable {
    RarityWeightTable::new(vec![
        RarityWeightRow::until(
            Duration::from_secs(60),
            RarityWeights::from_array([100, 0, 0, 0, 0, 0]),
        ),
        RarityWeightRow::unbounded(RarityWeights::from_array([50, 0, 50, 0, 0, 0])),
    ])
}

#[test]
fn early_clock_always_draws_common() {
    let table = scenario_table();
    let mut scheduler = RarityScheduler::new(0x1234_5678);
    for _ in 0..1_000 {
        assert_eq!(
            scheduler.select_rarity(Duration::from_secs(30), &table),
            Rarity::Common
        );
    }
}

#[test]
fn late_clock_draws_rare_half_the_time() {
    let table = scenario_table();
    let mut scheduler = RarityScheduler::new(0x4d59_5df4_d0f3_3173);
    let draws = 1_000;
    let rare = (0..draws)
        .filter(|_| scheduler.select_rarity(Duration::from_secs(90), &table) == Rarity::Rare)
        .count();
    let fraction = rare as f64 / f64::from(draws);
    assert!(
        (0.45..=0.55).contains(&fraction),
        "rare fraction {fraction} outside tolerance"
    );
}

#[test]
fn zero_total_weight_draws_lowest_tier() {
    let table = RarityWeightTable::new(vec![RarityWeightRow::unbounded(
        RarityWeights::default(),
    )]);
    let mut scheduler = RarityScheduler::new(1);
    assert_eq!(
        scheduler.select_rarity(Duration::from_secs(500), &table),
        Rarity::Common
    );
}

#[test]
fn fallback_prefers_weighted_higher_then_unweighted_higher_then_lower() {
    let weights = RarityWeights::from_array([10, 10, 10, 0, 5, 0]);
    assert_eq!(
        fallback_order(Rarity::Rare, &weights),
        vec![
            Rarity::Rare,
            Rarity::Legendary,
            Rarity::Epic,
            Rarity::Mythic,
            Rarity::Uncommon,
            Rarity::Common,
        ]
    );
}

#[test]
fn pick_uses_lowest_available_weighted_tier_at_or_above_request() {
    let weights = RarityWeights::from_array([10, 10, 10, 10, 10, 0]);
    let common = card(1, Rarity::Common);
    let epic = card(2, Rarity::Epic);
    let mythic = card(3, Rarity::Mythic);
    let pool = vec![&common, &mythic, &epic];

    let mut scheduler = RarityScheduler::new(9);
    let picked = scheduler
        .pick_template(Rarity::Rare, &weights, &pool)
        .expect("pool is not empty");
    assert_eq!(picked.id, epic.id, "weighted epic beats unweighted mythic");
}

#[test]
fn pick_reaches_unweighted_higher_tier_before_downgrading() {
    let weights = RarityWeights::from_array([10, 10, 0, 0, 0, 0]);
    let common = card(1, Rarity::Common);
    let mythic = card(2, Rarity::Mythic);
    let pool = vec![&common, &mythic];

    let mut scheduler = RarityScheduler::new(3);
    let picked = scheduler
        .pick_template(Rarity::Uncommon, &weights, &pool)
        .expect("pool is not empty");
    assert_eq!(picked.id, mythic.id);
}

#[test]
fn pick_falls_back_to_nearest_lower_tier_only_when_upper_tiers_are_empty() {
    let weights = RarityWeights::from_array([10, 10, 10, 10, 10, 10]);
    let common = card(1, Rarity::Common);
    let uncommon = card(2, Rarity::Uncommon);
    let pool = vec![&common, &uncommon];

    let mut scheduler = RarityScheduler::new(5);
    for _ in 0..50 {
        let picked = scheduler
            .pick_template(Rarity::Epic, &weights, &pool)
            .expect("pool is not empty");
        assert_eq!(picked.id, uncommon.id, "nearest lower tier must win");
    }
}

#[test]
fn pick_from_empty_pool_is_none() {
    let mut scheduler = RarityScheduler::new(5);
    let weights = RarityWeights::from_array([1, 1, 1, 1, 1, 1]);
    assert!(scheduler.pick_template(Rarity::Common, &weights, &[]).is_none());
}

#[test]
fn draft_offer_yields_distinct_templates_and_resolved_rarity() {
    let table = RarityWeightTable::new(vec![RarityWeightRow::unbounded(
        RarityWeights::from_array([0, 0, 0, 100, 0, 0]),
    )]);
    let common = card(1, Rarity::Common);
    let second = card(2, Rarity::Common);
    let mut scheduler = RarityScheduler::new(77);

    let drafted = scheduler.draft_offer(Duration::ZERO, &table, vec![&common, &second], 3);

    assert_eq!(drafted.len(), 2, "pool only holds two templates");
    assert_ne!(drafted[0].template.id, drafted[1].template.id);
    for entry in drafted {
        assert_eq!(entry.rarity, Rarity::Epic, "downgraded picks stay enhanced");
    }
}

#[test]
fn boss_draft_is_distinct_and_bounded() {
    let first = card(10, Rarity::Common).with_boss_traits(Default::default());
    let second = card(11, Rarity::Common).with_boss_traits(Default::default());
    let mut scheduler = RarityScheduler::new(21);

    let drafted = scheduler.draft_bosses(vec![&first, &second], 5);
    assert_eq!(drafted.len(), 2);
    assert_ne!(drafted[0].id, drafted[1].id);
    assert!(scheduler.draft_bosses(Vec::new(), 3).is_empty());
}

#[test]
fn identical_seeds_replay_identical_offers() {
    let table = scenario_table();
    let pool: Vec<CardTemplate> = (1..=6)
        .map(|id| card(id, if id % 2 == 0 { Rarity::Rare } else { Rarity::Common }))
        .collect();
    let draft = |seed| {
        let mut scheduler = RarityScheduler::new(seed);
        (0..20)
            .flat_map(|round| {
                scheduler
                    .draft_offer(
                        Duration::from_secs(round * 10),
                        &table,
                        pool.iter().collect(),
                        3,
                    )
                    .into_iter()
                    .map(|entry| (entry.template.id, entry.rarity))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(draft(99), draft(99));
}
