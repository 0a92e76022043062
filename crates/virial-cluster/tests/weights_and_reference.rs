use std::f64::consts::PI;

use approx::assert_relative_eq;
use virial_cluster::hard_sphere::{b2, reference_value};
use virial_cluster::{overlap_value, AbsoluteValue, ClusterValues, SamplingWeight, Side, Umbrella, WeightSpec};

#[test]
fn hard_sphere_b3_is_five_pi_squared_over_eighteen() {
    assert_relative_eq!(reference_value(3, 1.0).unwrap(), 5.0 * PI * PI / 18.0, max_relative = 1e-14);
    assert_relative_eq!(b2(1.0), 2.0 * PI / 3.0);
}

#[test]
fn hard_sphere_b4_matches_reduced_value() {
    // B4 / B2^3 = 0.2869495...
    let ratio = reference_value(4, 1.0).unwrap() / b2(1.0).powi(3);
    assert_relative_eq!(ratio, 0.28694950, max_relative = 1e-7);
}

#[test]
fn hard_sphere_values_scale_with_diameter() {
    let unit = reference_value(5, 1.0).unwrap();
    let doubled = reference_value(5, 2.0).unwrap();
    assert_relative_eq!(doubled / unit, 2.0f64.powi(12), max_relative = 1e-12);
}

#[test]
fn untabulated_order_is_an_error() {
    assert!(reference_value(13, 1.0).is_err());
    assert!(reference_value(1, 1.0).is_err());
}

#[test]
fn weights_are_non_negative() {
    let values = ClusterValues {
        reference: -0.25,
        target: 2.0,
    };
    assert_eq!(AbsoluteValue(Side::Reference).weight(&values), 0.25);
    assert_eq!(AbsoluteValue(Side::Target).weight(&values), 2.0);
    let umbrella = Umbrella {
        reference_weight: 2.0,
        target_weight: 0.5,
    };
    assert_eq!(umbrella.weight(&values), 1.5);
}

#[test]
fn weight_spec_builds_matching_weight() {
    let values = ClusterValues {
        reference: 1.0,
        target: -3.0,
    };
    let spec: WeightSpec = serde_json::from_str(r#"{"type":"absolute","side":"target"}"#).unwrap();
    assert_eq!(spec.build().weight(&values), 3.0);
}

#[test]
fn overlap_value_is_harmonic_like() {
    assert_eq!(overlap_value(0.0, 0.0, 1.0), 0.0);
    assert_relative_eq!(overlap_value(1.0, 1.0, 1.0), 0.5);
    assert_relative_eq!(overlap_value(2.0, 3.0, 0.5), 6.0 / 4.0);
}
