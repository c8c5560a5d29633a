use super::*;
use proptest::prelude::*;

const QUIET: f32 = -50.0;
const LOUD: f32 = -10.0;

fn sample(db: f32) -> LevelSample {
    LevelSample::now(db)
}

fn seeded(config: ControllerConfig) -> ProximityController {
    ProximityController::with_rng(config, StdRng::seed_from_u64(1234))
}

fn feed(controller: &mut ProximityController, db: f32, ticks: usize) -> Vec<TickOutcome> {
    (0..ticks)
        .map(|_| controller.on_level_sample(&sample(db)))
        .collect()
}

#[test]
fn test_starts_idle_at_max_distance() {
    let controller = seeded(ControllerConfig::default());
    assert_eq!(controller.phase(), ProximityPhase::Idle);
    assert_eq!(controller.state().distance, 190.0);
    assert!(!controller.state().visible);
    assert_eq!(controller.threshold(), -30.0);
}

#[test]
fn test_fifteen_quiet_ticks_reveal_entity() {
    let mut controller = seeded(ControllerConfig::default());

    let outcomes = feed(&mut controller, QUIET, 14);
    assert!(outcomes.iter().all(|o| !o.visible));
    assert_eq!(controller.state().silence_ticks, 14);
    assert_eq!(controller.state().distance, 190.0);

    let last = controller.on_level_sample(&sample(QUIET));
    assert_eq!(controller.state().silence_ticks, 15);
    assert!(last.visible);
    assert_eq!(last.phase, ProximityPhase::Approaching);
    assert_eq!(controller.state().distance, 185.0);
    assert!(controller.state().ever_shown);
}

#[test]
fn test_first_appearance_keeps_initial_angle() {
    let config = ControllerConfig {
        initial_angle: Some(1.5),
        ..Default::default()
    };
    let mut controller = seeded(config);
    let outcomes = feed(&mut controller, QUIET, 15);

    assert!(outcomes.iter().all(|o| o.relocated.is_none()));
    assert_eq!(controller.perturbation().base_angle, 1.5);
    assert!(controller.state().position_set);
}

#[test]
fn test_loud_sample_resets_silence() {
    let mut controller = seeded(ControllerConfig::default());
    feed(&mut controller, QUIET, 20);
    assert!(controller.state().visible);

    let outcome = controller.on_level_sample(&sample(LOUD));
    assert_eq!(controller.state().silence_ticks, 0);
    assert!(!outcome.visible);
    assert_eq!(outcome.phase, ProximityPhase::Idle);
    assert!(!controller.state().position_set);
}

#[test]
fn test_sample_equal_to_threshold_is_not_silence() {
    let mut controller = seeded(ControllerConfig::default());
    feed(&mut controller, QUIET, 3);
    controller.on_level_sample(&sample(-30.0));
    assert_eq!(controller.state().silence_ticks, 0);
}

#[test]
fn test_reactivation_rolls_new_angle_and_resets_distance() {
    let config = ControllerConfig {
        initial_angle: Some(0.25),
        ..Default::default()
    };
    let mut controller = seeded(config);

    feed(&mut controller, QUIET, 25);
    assert_eq!(controller.state().distance, 135.0);

    controller.on_level_sample(&sample(LOUD));
    let outcomes = feed(&mut controller, QUIET, 15);

    let relocations: Vec<f64> = outcomes.iter().filter_map(|o| o.relocated).collect();
    assert_eq!(relocations.len(), 1);
    let angle = relocations[0];
    assert!((0.0..std::f64::consts::TAU).contains(&angle));
    assert_eq!(controller.perturbation().base_angle, angle);
    // Reset to 190 then one step closer
    assert_eq!(controller.state().distance, 185.0);
}

#[test]
fn test_encounter_fires_once_and_cools_down() {
    let mut controller = seeded(ControllerConfig::default());

    // 14 ticks to accrue, then 38 steps of 5 from 190 to 0
    let outcomes = feed(&mut controller, QUIET, 14 + 38);
    let encounters: Vec<&TickOutcome> = outcomes.iter().filter(|o| o.encounter.is_some()).collect();
    assert_eq!(encounters.len(), 1);

    let hit = encounters[0];
    assert_eq!(hit.distance, 0.0);
    assert_eq!(hit.previous_phase, ProximityPhase::Approaching);
    assert_eq!(hit.phase, ProximityPhase::Idle);
    assert!(!hit.visible);
    assert_eq!(hit.encounter.as_ref().unwrap().sequence, 1);

    assert_eq!(controller.state().silence_ticks, 0);
    assert!(!controller.state().position_set);
    assert_eq!(controller.threshold(), -30.0);
    assert_eq!(controller.encounters(), 1);
}

#[test]
fn test_no_retrigger_right_after_encounter() {
    let mut controller = seeded(ControllerConfig::default());
    feed(&mut controller, QUIET, 52);
    assert_eq!(controller.encounters(), 1);

    // Silence has to accrue from scratch before the next approach
    let outcomes = feed(&mut controller, QUIET, 14);
    assert!(outcomes.iter().all(|o| !o.visible && o.encounter.is_none()));

    let next = controller.on_level_sample(&sample(QUIET));
    assert!(next.visible);
    assert!(next.relocated.is_some());
    assert_eq!(next.distance, 185.0);
}

#[test]
fn test_cooldown_holds_unreachable_threshold() {
    let config = ControllerConfig {
        cooldown_ticks: 3,
        ..Default::default()
    };
    let mut controller = seeded(config);
    let outcomes = feed(&mut controller, QUIET, 52);
    let last = outcomes.last().unwrap();
    assert!(last.encounter.is_some());
    assert_eq!(last.phase, ProximityPhase::Encounter);
    assert_eq!(controller.threshold(), COOLDOWN_THRESHOLD_DB);

    let cooldown = feed(&mut controller, QUIET, 2);
    assert!(cooldown.iter().all(|o| o.phase == ProximityPhase::Encounter));
    assert_eq!(controller.state().silence_ticks, 0);

    let done = controller.on_level_sample(&sample(QUIET));
    assert_eq!(done.phase, ProximityPhase::Idle);
    assert_eq!(controller.threshold(), -30.0);
    // The sample that ended the cooldown did not accrue
    assert_eq!(controller.state().silence_ticks, 0);
}

#[test]
fn test_threshold_is_settable() {
    let mut controller = seeded(ControllerConfig::default());
    controller.set_threshold(-60.0);
    assert_eq!(controller.threshold(), -60.0);

    // -50 dB is no longer quiet enough
    feed(&mut controller, QUIET, 20);
    assert_eq!(controller.state().silence_ticks, 0);
}

#[test]
fn test_threshold_set_during_cooldown_applies_after() {
    let config = ControllerConfig {
        cooldown_ticks: 1,
        ..Default::default()
    };
    let mut controller = seeded(config);
    feed(&mut controller, QUIET, 52);
    assert_eq!(controller.phase(), ProximityPhase::Encounter);

    controller.set_threshold(-35.0);
    assert_eq!(controller.threshold(), COOLDOWN_THRESHOLD_DB);
    assert_eq!(controller.operating_threshold(), -35.0);

    controller.on_level_sample(&sample(QUIET));
    assert_eq!(controller.threshold(), -35.0);
}

#[test]
fn test_snapshot_reflects_state() {
    let mut controller = seeded(ControllerConfig::default());
    feed(&mut controller, QUIET, 16);
    let snap = controller.snapshot();
    assert_eq!(snap.phase, ProximityPhase::Approaching);
    assert_eq!(snap.distance, 180.0);
    assert!(snap.visible);
    assert_eq!(snap.silence_ticks, 16);
}

proptest! {
    #[test]
    fn prop_distance_bounded_and_monotone_within_cycle(
        levels in prop::collection::vec(prop_oneof![Just(QUIET), Just(LOUD)], 1..400)
    ) {
        let mut controller = seeded(ControllerConfig::default());
        let mut previous = controller.state().distance;
        for db in levels {
            let outcome = controller.on_level_sample(&sample(db));
            prop_assert!(outcome.distance >= 0.0 && outcome.distance <= 190.0);
            if outcome.relocated.is_none() {
                prop_assert!(outcome.distance <= previous);
            }
            if outcome.visible {
                prop_assert!(outcome.phase != ProximityPhase::Idle);
            }
            if db >= controller.threshold() && outcome.encounter.is_none() {
                prop_assert_eq!(outcome.silence_ticks, 0);
            }
            previous = outcome.distance;
        }
    }

    #[test]
    fn prop_one_encounter_per_zero_crossing(
        levels in prop::collection::vec(prop_oneof![4 => Just(QUIET), 1 => Just(LOUD)], 1..600)
    ) {
        let mut controller = seeded(ControllerConfig::default());
        let mut previous = controller.state().distance;
        let mut crossings = 0u64;
        for db in levels {
            let outcome = controller.on_level_sample(&sample(db));
            let crossed = previous > 0.0 && outcome.distance == 0.0;
            prop_assert_eq!(crossed, outcome.encounter.is_some());
            if crossed {
                crossings += 1;
                prop_assert_eq!(controller.state().silence_ticks, 0);
                prop_assert!(!controller.state().position_set);
            }
            previous = outcome.distance;
        }
        prop_assert_eq!(crossings, controller.encounters());
    }
}
