use std::time::Duration;

use proptest::prelude::*;
use spawn_director_core::{ScalingTuning, StepMode, StepTuning};
use spawn_director_system_scaling::ScalingState;

const TOLERANCE: f32 = 1e-4;

fn tuning() -> ScalingTuning {
    ScalingTuning {
        interval: Duration::from_secs(10),
        health: StepTuning {
            percent: 0.10,
            ramp_per_tier: 0.02,
            mode: StepMode::Multiplicative,
        },
        experience: StepTuning {
            percent: 0.05,
            ramp_per_tier: 0.0,
            mode: StepMode::Multiplicative,
        },
        damage: StepTuning {
            percent: 0.25,
            ramp_per_tier: 0.0,
            mode: StepMode::Additive,
        },
        flat_discount_per_tier: Duration::from_millis(100),
    }
}

fn close(left: f32, right: f32) -> bool {
    (left - right).abs() <= TOLERANCE * left.abs().max(1.0)
}

#[test]
fn health_steps_ramp_with_tier_index() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(30));

    // Tier steps use 10%, 12%, then 14%.
    let expected = 1.10 * 1.12 * 1.14;
    assert_eq!(scaling.tier_index(), 3);
    assert!(close(scaling.health_multiplier(), expected));
    assert!(close(scaling.damage_multiplier(), 1.75));
    assert_eq!(scaling.phase_flat_discount(), Duration::from_millis(300));
}

#[test]
fn pause_freezes_tier_progression() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(5));
    scaling.pause();
    scaling.tick(Duration::from_secs(100));
    assert_eq!(scaling.tier_index(), 0);

    scaling.resume();
    scaling.tick(Duration::from_secs(5));
    assert_eq!(scaling.tier_index(), 1, "paused time must not count");
}

#[test]
fn rebase_keeps_observed_value_and_resets_phase() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(40));
    let before = scaling.multipliers();
    let tier = scaling.tier_index();

    scaling.rebase();

    let after = scaling.multipliers();
    assert!(close(before.health, after.health));
    assert!(close(before.experience, after.experience));
    assert!(close(before.damage, after.damage));
    assert_eq!(scaling.health().phase(), 1.0);
    assert_eq!(scaling.damage().phase(), 1.0);
    assert_eq!(scaling.tier_index(), tier);
    assert_eq!(scaling.phase_flat_discount(), Duration::ZERO);
}

#[test]
fn additive_steps_after_rebase_grow_relative_to_new_base() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(20));
    assert!(close(scaling.damage_multiplier(), 1.5));
    scaling.rebase();

    scaling.tick(Duration::from_secs(10));
    // The additive step lands on the phase half, so the base scales it.
    assert!(close(scaling.damage_multiplier(), 1.5 * 1.25));
}

#[test]
fn bonus_steps_use_current_tier_without_consuming_it() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(25));
    let before = scaling.health_multiplier();

    scaling.apply_bonus_steps(2);

    let step = 1.0 + 0.10 + 0.02 * 2.0;
    assert!(close(scaling.health_multiplier(), before * step * step));
    assert_eq!(scaling.tier_index(), 2);

    scaling.tick(Duration::from_secs(5));
    assert_eq!(scaling.tier_index(), 3, "tier timer must be untouched");
}

#[test]
fn reset_restores_origin() {
    let mut scaling = ScalingState::new(tuning());
    scaling.tick(Duration::from_secs(50));
    scaling.record_boss_completed();
    scaling.pause();

    scaling.reset();

    assert_eq!(scaling.tier_index(), 0);
    assert_eq!(scaling.completed_boss_count(), 0);
    assert_eq!(scaling.health_multiplier(), 1.0);
    assert!(!scaling.is_paused());
}

proptest! {
    #[test]
    fn rebase_never_changes_observed_multipliers(
        ticks in proptest::collection::vec(0u64..40_000, 1..12),
        bonus in 0u32..4,
    ) {
        let mut scaling = ScalingState::new(tuning());
        for (index, millis) in ticks.iter().enumerate() {
            scaling.tick(Duration::from_millis(*millis));
            if index % 3 == 2 {
                scaling.apply_bonus_steps(bonus);
                let before = scaling.multipliers();
                scaling.rebase();
                let after = scaling.multipliers();
                prop_assert!(close(before.health, after.health));
                prop_assert!(close(before.experience, after.experience));
                prop_assert!(close(before.damage, after.damage));
                prop_assert_eq!(scaling.health().phase(), 1.0);
            }
        }
    }
}
