use std::fs;

use approx::assert_relative_eq;
use tempfile::tempdir;
use virial_cluster::{f_bond, Cluster, HardSphere, SquareWell};
use virial_core::VirialError;
use virial_mcmc::{
    default_file_name, run_with_file, OverlapConfig, PersistedPreference, PreferenceSource,
    ReferencePreference,
};

fn hard_spheres() -> Cluster {
    Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap()
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

fn short_config() -> OverlapConfig {
    let mut config = OverlapConfig::default();
    config.points = 3;
    config.steps = 10;
    config.sub_steps = 200;
    config.block_size = 100;
    config.equilibration = 2;
    config.calibration.steps = 10;
    config
}

#[test]
fn statistically_identical_ensembles_calibrate_to_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(default_file_name(3, 1.0));
    let report = run_with_file(
        &short_config(),
        &hard_spheres(),
        &hard_spheres(),
        None,
        Some(path.clone()),
    )
    .unwrap();

    assert_eq!(report.preference_source, PreferenceSource::Searched);
    assert_relative_eq!(report.reference_preference, 1.0, max_relative = 1e-9);
    let stored = PersistedPreference::load(&path).unwrap().unwrap();
    assert!(!stored.fixed);
    assert_relative_eq!(stored.preference.value(), report.reference_preference);
}

#[test]
fn persisted_value_is_refined_and_rewritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("refpref3_1");
    PersistedPreference {
        preference: ReferencePreference::new(4.0).unwrap(),
        fixed: false,
    }
    .store(&path)
    .unwrap();

    let report = run_with_file(
        &short_config(),
        &hard_spheres(),
        &square_well(),
        None,
        Some(path.clone()),
    )
    .unwrap();

    assert_eq!(report.preference_source, PreferenceSource::Refined);
    assert!(report.reference_preference.is_finite() && report.reference_preference > 0.0);
    let stored = PersistedPreference::load(&path).unwrap().unwrap();
    assert_relative_eq!(stored.preference.value(), report.reference_preference);
}

#[test]
fn fixed_file_is_used_verbatim_and_left_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("refpref3_1");
    fs::write(&path, "0.75\nfixed\n").unwrap();

    let report = run_with_file(
        &short_config(),
        &hard_spheres(),
        &square_well(),
        None,
        Some(path.clone()),
    )
    .unwrap();

    assert_eq!(report.preference_source, PreferenceSource::Persisted);
    assert_eq!(report.reference_preference, 0.75);
    assert_eq!(fs::read_to_string(&path).unwrap(), "0.75\nfixed\n");
}

#[test]
fn configured_preference_wins_over_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("refpref3_1");
    fs::write(&path, "0.75\nfixed\n").unwrap();
    let mut config = short_config();
    config.calibration.preference = Some(3.0);

    let report = run_with_file(&config, &hard_spheres(), &square_well(), None, Some(path)).unwrap();
    assert_eq!(report.preference_source, PreferenceSource::Configured);
    assert_eq!(report.reference_preference, 3.0);
}

#[test]
fn out_of_range_preferences_are_degenerate() {
    for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = ReferencePreference::new(value).unwrap_err();
        assert!(matches!(err, VirialError::DegenerateCalibration(_)), "{value}");
        assert_eq!(err.info().code, "preference-out-of-range");
    }
    assert_eq!(ReferencePreference::new(0.5).unwrap().value(), 0.5);
}

#[test]
fn malformed_files_are_serde_errors() {
    let dir = tempdir().unwrap();
    let cases = [
        ("empty", ""),
        ("garbage", "not-a-number\n"),
        ("flag", "1.5\nfrozen\n"),
        ("zero", "0\n"),
    ];
    for (name, contents) in cases {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        let err = PersistedPreference::load(&path).unwrap_err();
        assert!(matches!(err, VirialError::Serde(_)), "{name}: {err}");
        assert!(err.info().context.contains_key("path"));
    }
    assert!(PersistedPreference::load(&dir.path().join("missing"))
        .unwrap()
        .is_none());
}

#[test]
fn default_file_name_encodes_size_and_temperature() {
    assert_eq!(default_file_name(4, 1.0), "refpref4_1");
    assert_eq!(default_file_name(5, 0.625), "refpref5_0.625");
}

#[test]
fn unusable_calibration_settings_are_config_errors() {
    let mut single_batch = short_config();
    single_batch.calibration.steps = 1;
    let err = single_batch.validate().unwrap_err();
    assert!(matches!(err, VirialError::Config(_)));
    assert_eq!(err.info().code, "calibration-steps");
    let err = run_with_file(&single_batch, &hard_spheres(), &square_well(), None, None).unwrap_err();
    assert_eq!(err.info().code, "calibration-steps");

    for span in [-4.0, 0.0, f64::NAN, f64::INFINITY] {
        let mut coarse = short_config();
        coarse.calibration.alpha_span = span;
        let err = coarse.validate().unwrap_err();
        assert_eq!(err.info().code, "alpha-span", "{span}");
        assert!(err.info().context.contains_key("alpha_span"));

        let mut refine = short_config();
        refine.calibration.refine_span = span;
        let err = refine.validate().unwrap_err();
        assert_eq!(err.info().code, "alpha-span", "{span}");
        assert!(err.info().context.contains_key("refine_span"));
    }
}
