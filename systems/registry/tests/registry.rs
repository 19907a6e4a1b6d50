use std::time::Duration;

use proptest::prelude::*;
use spawn_director_core::{
    BehaviorKind, BlueprintId, BossTraits, CardId, CardTemplate, EnhancementTuning,
    IntervalTuning, Rarity,
};
use spawn_director_system_registry::{
    cooldown_scale, IntervalContext, Registration, RegistrationPhase, SourceRegistry,
};

fn tuning() -> IntervalTuning {
    IntervalTuning {
        min_interval: Duration::from_millis(250),
        per_extra_source_factor: 0.5,
        global_per_boss_discount: Duration::from_millis(200),
        boss_event_multiplier: 2.0,
        first_card_reduction: 0.5,
        first_card_window: Duration::from_secs(30),
        off_camera_speed_reduction: 0.25,
        first_fire_delay: Duration::from_secs(1),
    }
}

fn registry() -> SourceRegistry {
    SourceRegistry::new(tuning(), EnhancementTuning::default())
}

fn card(id: u32, blueprint: u32, seconds: u64) -> CardTemplate {
    CardTemplate::new(
        CardId::new(id),
        Rarity::Common,
        Duration::from_secs(seconds),
        BlueprintId::new(blueprint),
        BehaviorKind::Chaser,
    )
}

fn boss_card(id: u32, seconds: u64) -> CardTemplate {
    card(id, 900 + id, seconds).with_boss_traits(BossTraits::default())
}

fn running(registry: &mut SourceRegistry, template: CardTemplate) -> Registration {
    let rarity = template.rarity;
    registry.register(
        template,
        rarity,
        None,
        RegistrationPhase::Running,
        &IntervalContext::default(),
    )
}

#[test]
fn registry_size_penalty_applies_to_every_source() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = running(&mut registry, card(1, 1, 10));
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(10)
    );

    let _ = running(&mut registry, card(2, 2, 10));
    for source in registry.sources() {
        assert_eq!(
            registry.effective_interval(source, &context),
            Duration::from_secs(15)
        );
    }
}

#[test]
fn completed_bosses_discount_ordinary_sources_only() {
    let mut registry = registry();
    let _ = running(&mut registry, card(1, 1, 10));
    let _ = running(&mut registry, boss_card(2, 10));

    let before = IntervalContext::default();
    let after = IntervalContext {
        completed_boss_count: 1,
        ..before
    };

    let ordinary = &registry.sources()[0];
    let boss = &registry.sources()[1];
    assert_eq!(
        registry.effective_interval(ordinary, &before)
            - registry.effective_interval(ordinary, &after),
        Duration::from_millis(200)
    );
    assert_eq!(
        registry.effective_interval(boss, &before),
        registry.effective_interval(boss, &after)
    );
    assert_eq!(
        registry.effective_interval(boss, &after),
        Duration::from_secs(10)
    );
}

#[test]
fn discounts_clamp_at_minimum_interval() {
    let mut registry = registry();
    let _ = running(&mut registry, card(1, 1, 1));
    let context = IntervalContext {
        phase_flat_discount: Duration::from_secs(5),
        completed_boss_count: 40,
        ..IntervalContext::default()
    };
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_millis(250)
    );
}

#[test]
fn boss_event_multiplier_slows_ordinary_sources() {
    let mut registry = registry();
    let _ = running(&mut registry, card(1, 1, 4));
    let context = IntervalContext {
        boss_event_active: true,
        ..IntervalContext::default()
    };
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(8)
    );
}

#[test]
fn duplicate_registration_updates_template_and_keeps_countdown() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let first = running(&mut registry, card(1, 7, 10));
    let _ = registry.tick(Duration::from_millis(400), &context);
    let countdown = registry.sources()[0].countdown();

    let second = registry.register(
        card(2, 7, 3),
        Rarity::Rare,
        None,
        RegistrationPhase::Running,
        &context,
    );

    assert!(matches!(first, Registration::Added(_)));
    assert!(matches!(second, Registration::Updated(_)));
    assert_eq!(registry.len(), 1);
    let source = &registry.sources()[0];
    assert_eq!(source.template().id, CardId::new(2));
    assert_eq!(source.rarity(), Rarity::Rare);
    assert_eq!(source.countdown(), countdown);
    assert!(registry.was_selected(CardId::new(1)));
    assert!(registry.was_selected(CardId::new(2)));
}

#[test]
fn first_initial_card_is_discounted_until_window_expires() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = registry.register(
        card(1, 1, 10),
        Rarity::Common,
        None,
        RegistrationPhase::Initial,
        &context,
    );
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(5)
    );

    let fired = registry.tick(Duration::from_secs(1), &context);
    assert_eq!(fired.len(), 1);
    assert!(fired[0].first_fire);
    assert!((fired[0].off_camera_speed_scale - 0.75).abs() < 1e-6);

    let _ = registry.tick(Duration::from_secs(30), &context);
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(10)
    );
}

#[test]
fn only_the_first_ordinary_initial_card_is_discounted() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = registry.register(
        boss_card(9, 10),
        Rarity::Boss,
        None,
        RegistrationPhase::Initial,
        &context,
    );
    let _ = registry.register(
        card(1, 1, 10),
        Rarity::Common,
        None,
        RegistrationPhase::Initial,
        &context,
    );
    let _ = registry.register(
        card(2, 2, 10),
        Rarity::Common,
        None,
        RegistrationPhase::Initial,
        &context,
    );

    // Three sources: penalty factor 1 + 0.5 * 2.
    let discounted = registry.effective_interval(&registry.sources()[1], &context);
    let plain = registry.effective_interval(&registry.sources()[2], &context);
    assert_eq!(discounted, Duration::from_secs(10));
    assert_eq!(plain, Duration::from_secs(20));
}

#[test]
fn running_phase_registrations_never_get_the_first_card_discount() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = running(&mut registry, card(1, 1, 10));
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(10)
    );
}

#[test]
fn zero_interval_boss_source_fires_at_the_floor_cadence() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = running(&mut registry, boss_card(1, 0));
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_millis(250)
    );

    let fires: usize = (0..10)
        .map(|_| registry.tick(Duration::from_millis(100), &context).len())
        .sum();
    assert_eq!(fires, 4);
}

#[test]
fn sources_fire_once_per_tick_and_carry_overshoot() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = running(&mut registry, card(1, 1, 2));

    let fired = registry.tick(Duration::from_millis(1_500), &context);
    assert_eq!(fired.len(), 1);
    assert!(fired[0].first_fire);
    assert_eq!(registry.sources()[0].countdown(), Duration::from_millis(1_500));

    assert!(registry
        .tick(Duration::from_millis(1_000), &context)
        .is_empty());

    let fired = registry.tick(Duration::from_secs(10), &context);
    assert_eq!(fired.len(), 1, "a long tick still fires once");
    assert!(!fired[0].first_fire);
    assert!(!registry.sources()[0].is_first_fire());
}

#[test]
fn suppression_freezes_ordinary_sources_only() {
    let mut registry = registry();
    let _ = running(&mut registry, card(1, 1, 10));
    let _ = running(&mut registry, boss_card(2, 10));
    let suppressed = IntervalContext {
        suppressed: true,
        ..IntervalContext::default()
    };
    let ordinary_countdown = registry.sources()[0].countdown();

    let fired = registry.tick(Duration::from_secs(5), &suppressed);

    assert_eq!(fired.len(), 1);
    assert!(fired[0].template.is_boss_tier());
    assert_eq!(registry.sources()[0].countdown(), ordinary_countdown);
}

#[test]
fn reset_countdowns_shortens_by_fraction() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = running(&mut registry, card(1, 1, 10));

    registry.reset_countdowns(0.5, &context);

    assert_eq!(registry.sources()[0].countdown(), Duration::from_secs(5));
}

#[test]
fn clear_forgets_sources_and_selections() {
    let mut registry = registry();
    let _ = running(&mut registry, card(1, 1, 10));
    registry.clear();
    assert!(registry.is_empty());
    assert!(!registry.was_selected(CardId::new(1)));
}

#[test]
fn interval_override_replaces_template_interval() {
    let mut registry = registry();
    let context = IntervalContext::default();
    let _ = registry.register(
        card(1, 1, 10),
        Rarity::Common,
        Some(Duration::from_secs(3)),
        RegistrationPhase::Running,
        &context,
    );
    assert_eq!(
        registry.effective_interval(&registry.sources()[0], &context),
        Duration::from_secs(3)
    );
}

#[test]
fn enhanced_ranged_variants_shoot_faster() {
    let tuning = EnhancementTuning::default();
    let ranged = CardTemplate::new(
        CardId::new(1),
        Rarity::Common,
        Duration::from_secs(5),
        BlueprintId::new(1),
        BehaviorKind::Ranged,
    );
    let swarm = CardTemplate {
        behavior: BehaviorKind::Swarm,
        ..ranged.clone()
    };

    assert_eq!(cooldown_scale(&ranged, Rarity::Common, &tuning), 1.0);
    let expected = 1.0 - tuning.ranged_shot_bonus * 2.0;
    assert!((cooldown_scale(&ranged, Rarity::Rare, &tuning) - expected).abs() < 1e-6);
    assert_eq!(cooldown_scale(&swarm, Rarity::Mythic, &tuning), 1.0);
    assert!(cooldown_scale(&ranged, Rarity::Mythic, &tuning) >= tuning.min_cooldown_scale);
}

proptest! {
    #[test]
    fn effective_interval_never_drops_below_floor(
        base_ms in 0u64..20_000,
        sources in 1usize..6,
        flat_ms in 0u64..20_000,
        bosses in 0u32..50,
        boss_event in any::<bool>(),
        initial in any::<bool>(),
        boss_tier in prop::collection::vec(any::<bool>(), 6),
    ) {
        let mut registry = registry();
        let context = IntervalContext {
            phase_flat_discount: Duration::from_millis(flat_ms),
            completed_boss_count: bosses,
            boss_event_active: boss_event,
            suppressed: false,
        };
        let phase = if initial {
            RegistrationPhase::Initial
        } else {
            RegistrationPhase::Running
        };
        for index in 0..sources {
            let id = u32::try_from(index).unwrap_or(u32::MAX);
            let mut template = if boss_tier[index] {
                boss_card(id, 1)
            } else {
                card(id, id, 1)
            };
            template.spawn_interval = Duration::from_millis(base_ms);
            let rarity = template.rarity;
            let _ = registry.register(template, rarity, None, phase, &context);
        }
        for source in registry.sources() {
            prop_assert!(registry.effective_interval(source, &context) >= tuning().min_interval);
        }
    }
}
