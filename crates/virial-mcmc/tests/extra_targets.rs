use approx::assert_relative_eq;
use virial_cluster::{f_bond, hard_sphere, Cluster, HardSphere, SquareWell};
use virial_mcmc::{build_with_extras, run_with_extras, EstimatorKind, OverlapConfig};

fn hard_spheres(sigma: f64) -> Cluster {
    Cluster::biconnected(3, f_bond(HardSphere { sigma })).unwrap()
}

fn square_well() -> Cluster {
    Cluster::biconnected(
        3,
        f_bond(SquareWell {
            sigma: 0.5,
            lambda: 2.0,
            epsilon: 1.0,
        }),
    )
    .unwrap()
}

fn config() -> OverlapConfig {
    let mut config = OverlapConfig::default();
    config.points = 3;
    config.steps = 200;
    config.sub_steps = 1000;
    config.block_size = 1000;
    config.adjust_fraction = false;
    config.calibration.preference = Some(3.0);
    config
}

#[test]
fn extra_copy_of_the_target_reproduces_the_main_ratio() {
    let mut config = config();
    config.steps = 40;
    let report = run_with_extras(
        &config,
        &hard_spheres(1.0),
        &square_well(),
        &[square_well()],
        None,
        None,
    )
    .unwrap();

    assert_eq!(report.extra_targets.len(), 1);
    let extra = &report.extra_targets[0];
    assert_eq!(extra.index, 0);
    assert_eq!(extra.estimator, report.estimator);
    assert_eq!(extra.ratio, report.ratio);
    assert_eq!(extra.ratio_error, report.ratio_error);
    for ensemble in [&report.reference, &report.target] {
        assert_eq!(ensemble.extra_ratios.len(), 1);
        assert_eq!(ensemble.extra_ratios[0].ratio, ensemble.ratio);
        assert_eq!(ensemble.streams.len(), 3);
        assert_eq!(ensemble.streams[2].name, "extra0/weight");
    }
}

#[test]
fn extra_target_inside_the_target_support_is_estimated() {
    let b3 = hard_sphere::reference_value(3, 1.0).unwrap();
    let report = run_with_extras(
        &config(),
        &hard_spheres(1.0),
        &hard_spheres(1.2),
        &[hard_spheres(1.0), hard_spheres(1.1)],
        Some(b3),
        None,
    )
    .unwrap();

    assert_eq!(report.estimator, EstimatorKind::Overlap);
    let expected = [1.0, 1.1_f64.powi(6)];
    assert_eq!(report.extra_targets.len(), expected.len());
    for (extra, exact) in report.extra_targets.iter().zip(expected) {
        assert!(extra.ratio_error > 0.0 && extra.ratio_error.is_finite());
        assert!(
            (extra.ratio - exact).abs() < 5.0 * extra.ratio_error + 0.01 * exact,
            "extra {} ratio {} +/- {} vs {exact}",
            extra.index,
            extra.ratio,
            extra.ratio_error
        );
        assert_relative_eq!(extra.full_value.unwrap(), extra.ratio * b3, max_relative = 1e-12);
        assert_relative_eq!(
            extra.full_value_error.unwrap(),
            extra.ratio_error * b3,
            max_relative = 1e-12
        );
    }
}

#[test]
fn extra_targets_must_match_the_point_count() {
    let four = Cluster::biconnected(4, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let err = build_with_extras(&config(), &hard_spheres(1.0), &square_well(), &[four]).unwrap_err();
    assert_eq!(err.info().code, "cluster-points");
    assert_eq!(err.info().context["cluster"], "extra0");
}

#[test]
fn extra_columns_sit_before_the_overlap_streams() {
    let mut overlap =
        build_with_extras(&config(), &hard_spheres(1.0), &square_well(), &[hard_spheres(1.0)]).unwrap();
    overlap.run(4).unwrap();

    assert_eq!(overlap.extra_target_count(), 1);
    assert_eq!(overlap.extra_column(0), 2);
    assert_eq!(overlap.overlap_column(), 3);
    let err = overlap.estimate_extra(1).unwrap_err();
    assert_eq!(err.info().code, "extra-target-index");
    assert!(overlap.estimate_extra(0).unwrap().ratio.is_finite());
}
