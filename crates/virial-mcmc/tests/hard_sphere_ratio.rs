use std::f64::consts::PI;

use approx::assert_relative_eq;
use virial_cluster::{f_bond, hard_sphere, Cluster, HardSphere};
use virial_mcmc::{run, EstimatorKind, OverlapConfig, PreferenceSource};

fn hard_sphere_cluster() -> Cluster {
    Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap()
}

fn scenario_config() -> OverlapConfig {
    let mut config = OverlapConfig::default();
    config.points = 3;
    config.steps = 100;
    config.sub_steps = 1000;
    config.block_size = 1000;
    config.reference_fraction = 0.5;
    config.adjust_fraction = false;
    config
}

#[test]
fn identical_hard_sphere_clusters_give_unit_ratio() {
    let cluster = hard_sphere_cluster();
    let b3 = hard_sphere::reference_value(3, 1.0).unwrap();
    assert_relative_eq!(b3, 5.0 * PI * PI / 18.0, max_relative = 1e-12);

    let report = run(&scenario_config(), &cluster, &cluster, Some(b3)).unwrap();

    assert_eq!(report.estimator, EstimatorKind::Overlap);
    assert_eq!(report.preference_source, PreferenceSource::Searched);
    assert_relative_eq!(report.reference_preference, 1.0, max_relative = 1e-9);
    assert!((report.ratio - 1.0).abs() < 0.01, "ratio {}", report.ratio);
    assert!(report.ratio_error < 0.01);
    assert_eq!(report.reference.samples, 50_000);
    assert_eq!(report.target.samples, 50_000);
    for ensemble in [&report.reference, &report.target] {
        let full = ensemble.full_value.unwrap();
        assert_relative_eq!(full, b3, max_relative = 0.01);
    }
    assert_relative_eq!(report.full_value.unwrap(), b3, max_relative = 0.01);
}

#[test]
fn fixed_preference_skips_calibration() {
    let cluster = hard_sphere_cluster();
    let mut config = scenario_config();
    config.steps = 20;
    config.calibration.preference = Some(2.5);

    let report = run(&config, &cluster, &cluster, None).unwrap();

    assert_eq!(report.preference_source, PreferenceSource::Configured);
    assert_eq!(report.reference_preference, 2.5);
    assert!(report.full_value.is_none());
    assert!((report.ratio - 1.0).abs() < 1e-9);
}

#[test]
fn acceptance_is_reported_per_move() {
    let cluster = hard_sphere_cluster();
    let mut config = scenario_config();
    config.steps = 10;
    let report = run(&config, &cluster, &cluster, None).unwrap();
    let rate = report.reference.acceptance["translate-all"];
    assert!(rate > 0.0 && rate < 1.0, "acceptance {rate}");
}

fn wider_hard_spheres() -> Cluster {
    Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.2 })).unwrap()
}

fn scaling_config(steps: usize) -> OverlapConfig {
    let mut config = scenario_config();
    config.steps = steps;
    config.calibration.preference = Some(3.0);
    config
}

#[test]
fn error_shrinks_with_the_square_root_of_samples() {
    let exact = 1.2_f64.powi(6);
    let short = run(&scaling_config(100), &hard_sphere_cluster(), &wider_hard_spheres(), None).unwrap();
    let long = run(&scaling_config(400), &hard_sphere_cluster(), &wider_hard_spheres(), None).unwrap();

    for report in [&short, &long] {
        assert_eq!(report.estimator, EstimatorKind::Overlap);
        assert!(report.ratio_error > 0.0 && report.ratio_error.is_finite());
        assert!(
            (report.ratio - exact).abs() < 5.0 * report.ratio_error + 0.01 * exact,
            "ratio {} +/- {} vs {exact}",
            report.ratio,
            report.ratio_error
        );
    }
    assert_eq!(long.reference.samples, 4 * short.reference.samples);
    let shrink = short.ratio_error / long.ratio_error;
    assert!((1.5..=2.7).contains(&shrink), "error ratio {shrink}");
}
