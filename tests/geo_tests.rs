//! Geo helper tests

use vehicle_sim::simulation::{distance_km, move_toward, Wgs84, EARTH_RADIUS_KM};

#[test]
fn test_distance_between_nearby_points() {
    let a = Wgs84::new(48.0, 8.0);
    let b = Wgs84::new(48.01, 8.0);

    // 0.01 degrees of latitude is about 1.112 km
    let distance = distance_km(a, b);
    assert!(
        (distance - 1.112).abs() < 0.001,
        "Unexpected distance: {}",
        distance
    );
    assert!((distance - distance_km(b, a)).abs() < 1e-12);
}

#[test]
fn test_distance_of_coincident_points_is_zero() {
    let a = Wgs84::new(49.0268, 8.3855);
    assert_eq!(distance_km(a, a), 0.0);
}

#[test]
fn test_distance_of_antipodal_points() {
    let a = Wgs84::new(0.0, 0.0);
    let b = Wgs84::new(0.0, 180.0);

    let distance = distance_km(a, b);
    assert!(distance.is_finite());
    assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-3);
}

#[test]
fn test_move_toward_halfway() {
    let a = Wgs84::new(48.0, 8.0);
    let b = Wgs84::new(48.01, 8.0);

    let halfway = move_toward(a, b, distance_km(a, b) / 2.0);
    assert!((halfway.latitude - 48.005).abs() < 1e-9);
    assert!((halfway.longitude - 8.0).abs() < 1e-9);
}

#[test]
fn test_move_toward_zero_km_stays_put() {
    let a = Wgs84::new(48.0, 8.0);
    let b = Wgs84::new(48.01, 8.01);

    assert_eq!(move_toward(a, b, 0.0), a);
}

#[test]
fn test_move_toward_coincident_points_returns_start() {
    let a = Wgs84::new(48.0, 8.0);

    // No direction to move in, no matter how far we are asked to go
    for km in [0.0, 0.5, 100.0] {
        let moved = move_toward(a, a, km);
        assert_eq!(moved, a);
        assert!(moved.is_finite());
    }
}

#[test]
fn test_display_format() {
    let a = Wgs84::new(48.5, 8.25);
    assert_eq!(a.to_string(), "48.5, 8.25");
}
