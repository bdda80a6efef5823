use super::*;

fn normalizer() -> SignalNormalizer {
    SignalNormalizer::from_max_range(Some(5.0), 8.0)
}

fn proximity(distance_cm: f32) -> SensorSample {
    SensorSample::Proximity {
        t_ms: 0,
        distance_cm,
    }
}

fn accel(x: f32, y: f32, z: f32) -> SensorSample {
    SensorSample::Acceleration { t_ms: 0, x, y, z }
}

#[test]
fn threshold_is_half_of_max_range() {
    let n = normalizer();
    assert_eq!(n.max_range_cm(), 5.0);
    assert_eq!(n.near_threshold_cm(), 2.5);
    assert_eq!(n.classify_distance(0.0), ProximityState::Near);
    assert_eq!(n.classify_distance(2.4), ProximityState::Near);
    assert_eq!(n.classify_distance(2.5), ProximityState::Far);
    assert_eq!(n.classify_distance(5.0), ProximityState::Far);
}

#[test]
fn unusable_range_uses_fallback() {
    for reported in [None, Some(0.0), Some(-3.0), Some(f32::NAN), Some(f32::INFINITY)] {
        let n = SignalNormalizer::from_max_range(reported, 8.0);
        assert_eq!(n.max_range_cm(), 8.0, "reported {reported:?}");
        assert_eq!(n.near_threshold_cm(), 4.0);
    }
}

#[test]
fn out_of_range_distances_are_clamped() {
    let n = normalizer();
    assert_eq!(n.classify_distance(-1.0), ProximityState::Near);
    assert_eq!(n.classify_distance(1_000.0), ProximityState::Far);
}

#[test]
fn nan_proximity_is_ignored() {
    let n = normalizer();
    let current = NormalizedReading {
        proximity: ProximityState::Far,
        ..NormalizedReading::default()
    };
    let (next, update) = n.normalize(&current, &proximity(f32::NAN));
    assert_eq!(update, ReadingUpdate::Ignored);
    assert_eq!(next, current);
}

#[test]
fn acceleration_yields_unit_gravity_and_inclination() {
    let n = normalizer();
    let (next, update) = n.normalize(&NormalizedReading::default(), &accel(0.0, 9.81, 0.0));
    assert_eq!(update, ReadingUpdate::Acceleration);
    assert_eq!(next.inclination_deg, Some(0));
    assert!((next.gravity[1] - 1.0).abs() < 1e-6);

    let (next, _) = n.normalize(&next, &accel(9.81, 0.0, 0.0));
    assert_eq!(next.inclination_deg, Some(90));

    let (next, _) = n.normalize(&next, &accel(-4.0, -4.0, 1.0));
    assert_eq!(next.inclination_deg, Some(-135));
}

#[test]
fn upside_down_reports_positive_180() {
    assert_eq!(inclination_deg([0.0, -1.0, 0.0]), 180);
    assert_eq!(inclination_deg([-0.0, -1.0, 0.0]), 180);
}

#[test]
fn zero_norm_acceleration_keeps_previous_reading() {
    let n = normalizer();
    let (upright, _) = n.normalize(&NormalizedReading::default(), &accel(0.0, 9.81, 0.0));
    let (next, update) = n.normalize(&upright, &accel(0.0, 0.0, 0.0));
    assert_eq!(update, ReadingUpdate::Ignored);
    assert_eq!(next, upright);

    let (next, update) = n.normalize(&upright, &accel(f32::NAN, 1.0, 0.0));
    assert_eq!(update, ReadingUpdate::Ignored);
    assert_eq!(next, upright);
}

#[test]
fn magnetic_field_is_stored_without_touching_orientation() {
    let n = normalizer();
    let (upright, _) = n.normalize(&NormalizedReading::default(), &accel(0.0, 9.81, 0.0));
    let sample = SensorSample::MagneticField {
        t_ms: 5,
        x: 12.0,
        y: -30.0,
        z: 4.5,
    };
    let (next, update) = n.normalize(&upright, &sample);
    assert_eq!(update, ReadingUpdate::MagneticField);
    assert_eq!(next.magnetic, Some([12.0, -30.0, 4.5]));
    assert_eq!(next.inclination_deg, upright.inclination_deg);
}
