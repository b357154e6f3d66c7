//! Drivetrain model tests: retargeting, speed approach and gear shifting

use rand::rngs::StdRng;
use rand::SeedableRng;
use vehicle_sim::simulation::{
    approach_target, shift, DriveControl, DrivetrainParams, TargetStatus, LAUNCH_SPEED_KMH,
};

#[test]
fn test_default_params_are_valid() {
    let params = DrivetrainParams::default();
    assert!(params.validate().is_ok());
    assert_eq!(params.rpm_lower(), 1200.0);
    assert_eq!(params.rpm_upper(), 2800.0);
    assert_eq!(params.retarget_hold_millis(), 5000);
}

#[test]
fn test_invalid_params_are_rejected() {
    let no_gears = DrivetrainParams {
        gear_count: 0,
        ..DrivetrainParams::default()
    };
    assert!(no_gears.validate().is_err());

    let no_braking = DrivetrainParams {
        deceleration_factor: 1.5,
        ..DrivetrainParams::default()
    };
    assert!(no_braking.validate().is_err());

    let rpm_upside_down = DrivetrainParams {
        min_rpm: 5000.0,
        ..DrivetrainParams::default()
    };
    assert!(rpm_upside_down.validate().is_err());
}

#[test]
fn test_first_retarget_uses_startup_boost() {
    let params = DrivetrainParams::default();
    let mut control = DriveControl::new(&params);
    assert!(control.retarget_due(0, &params));

    // 100 + 0.5 * 40 = 120, above the max delta so pulled down by 20
    let target = control.retarget(0.0, 0.5, &params);
    assert_eq!(target, 100.0);
    assert_eq!(control.previous_speed_kmh, 100.0);
    assert_eq!(control.startup_boost_kmh, 0.0);
    assert_eq!(control.status, TargetStatus::Pending);
}

#[test]
fn test_later_retargets_use_current_speed() {
    let params = DrivetrainParams::default();
    let mut control = DriveControl::new(&params);
    control.retarget(0.0, 0.0, &params);

    // 10 + 0 stays below the max delta, no pull-down
    assert_eq!(control.retarget(10.0, 0.0, &params), 10.0);
    assert_eq!(control.previous_speed_kmh, 10.0);

    // 30 + 20 = 50 exceeds 40, so 50 - 20
    assert_eq!(control.retarget(30.0, 0.5, &params), 30.0);
}

#[test]
fn test_retarget_waits_for_hold_time() {
    let params = DrivetrainParams::default();
    let mut control = DriveControl::new(&params);
    control.retarget(0.0, 0.5, &params);

    // Not reached yet, never due
    assert!(!control.retarget_due(1_000_000, &params));

    control.status = TargetStatus::ReachedAt(1_000);
    assert!(!control.retarget_due(5_999, &params));
    assert!(control.retarget_due(6_000, &params));
}

#[test]
fn test_maybe_retarget_with_seeded_rng() {
    let params = DrivetrainParams::default();
    let mut control = DriveControl::new(&params);
    let mut rng = StdRng::seed_from_u64(42);

    let target = control
        .maybe_retarget(0.0, 0, &params, &mut rng)
        .expect("First update always picks a target");
    assert!(
        (80.0..120.0).contains(&target),
        "Target out of range: {}",
        target
    );

    // Pending target, nothing to do
    assert_eq!(control.maybe_retarget(0.0, 60_000, &params, &mut rng), None);
}

#[test]
fn test_launch_from_standstill() {
    let params = DrivetrainParams::default();

    let speed = approach_target(0.0, 50.0, &params);
    let expected = LAUNCH_SPEED_KMH * params.acceleration_factor.powi(6);
    assert!((speed - expected).abs() < 1e-9);

    // Without a target the vehicle stays put
    assert_eq!(approach_target(0.0, 0.0, &params), 0.0);
}

#[test]
fn test_acceleration_clamps_to_target() {
    let params = DrivetrainParams::default();
    assert_eq!(approach_target(40.0, 41.0, &params), 41.0);
    assert_eq!(approach_target(29.0, 30.5, &params), 30.5);
}

#[test]
fn test_braking_clamps_to_target() {
    let params = DrivetrainParams::default();
    assert_eq!(approach_target(100.0, 50.0, &params), 50.0);
    assert_eq!(approach_target(100.0, 1.0, &params), 4.0);
}

#[test]
fn test_speed_approaches_target_monotonically() {
    let params = DrivetrainParams::default();
    let values = [0.0, 0.5, 2.0, 10.0, 29.9, 30.0, 45.0, 80.0, 120.0, 200.0];

    for &speed in &values {
        for &target in &values {
            let next = approach_target(speed, target, &params);
            if speed < target {
                assert!(next >= speed && next <= target, "{} -> {} via {}", speed, target, next);
            } else if speed > target {
                assert!(next <= speed && next >= target, "{} -> {} via {}", speed, target, next);
            } else {
                assert_eq!(next, target);
            }
        }
    }
}

#[test]
fn test_adjust_speed_records_reached_time() {
    let params = DrivetrainParams::default();
    let mut control = DriveControl::new(&params);
    control.target_speed_kmh = 41.0;
    control.status = TargetStatus::Pending;

    let speed = control.adjust_speed(40.0, 7_000, &params);
    assert_eq!(speed, 41.0);
    assert_eq!(control.status, TargetStatus::ReachedAt(7_000));

    // Already reached, the timestamp stays
    control.adjust_speed(41.0, 9_000, &params);
    assert_eq!(control.status, TargetStatus::ReachedAt(7_000));
}

#[test]
fn test_shift_from_neutral() {
    let params = DrivetrainParams::default();

    assert_eq!(shift(0.0, 0, &params), (0, 0.0));

    let (gear, rpm) = shift(2.0, 0, &params);
    assert_eq!(gear, 1);
    assert!((rpm - 4000.0 * 2.0 / 30.0).abs() < 1e-9);
}

#[test]
fn test_shift_up_and_down() {
    let params = DrivetrainParams::default();

    let (gear, rpm) = shift(50.0, 1, &params);
    assert_eq!(gear, 3);
    assert!((rpm - 2222.222).abs() < 0.01);

    let (gear, _) = shift(10.0, 6, &params);
    assert_eq!(gear, 1);

    let (gear, rpm) = shift(20.0, 4, &params);
    assert_eq!(gear, 2);
    assert!((rpm - 1333.333).abs() < 0.01);
}

#[test]
fn test_shift_pins_at_top_gear() {
    let params = DrivetrainParams::default();

    let (gear, rpm) = shift(200.0, 1, &params);
    assert_eq!(gear, params.gear_count);
    assert!(rpm > params.rpm_upper());
}

#[test]
fn test_shift_settles_inside_comfort_band() {
    let params = DrivetrainParams::default();

    let mut speed = 0.1;
    while speed < 400.0 {
        for start_gear in 0..=params.gear_count {
            let (gear, rpm) = shift(speed, start_gear, &params);
            assert!(gear >= 1 && gear <= params.gear_count);
            assert!(rpm >= 0.0);
            assert_eq!(rpm, params.rpm_for(speed, gear));

            let pinned = gear == 1 || gear == params.gear_count;
            let in_band = rpm >= params.rpm_lower() && rpm <= params.rpm_upper();
            assert!(
                pinned || in_band,
                "{} km/h from gear {} ended at gear {} with {} rpm",
                speed,
                start_gear,
                gear,
                rpm
            );
        }
        speed += 0.37;
    }
}
