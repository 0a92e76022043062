use std::path::PathBuf;

use virial_cluster::{Cluster, ClusterIntegrand};
use virial_core::{ClusterBox, ErrorInfo, Molecule, RngHandle, Vec3, VirialError};

use crate::calibrate::Calibrator;
use crate::config::OverlapConfig;
use crate::determinism;
use crate::ensemble::{Ensemble, EnsembleIntegrator};
use crate::moves::MoveSet;
use crate::overlap::{AlphaGrid, OverlapIntegrator};
use crate::report::{self, ExtraTargetReport, OverlapReport};
use crate::seed::RingSeed;

/// Builds a seeded, coupled pair of chains for `reference` and `target`.
pub fn build(
    config: &OverlapConfig,
    reference: &Cluster,
    target: &Cluster,
) -> Result<OverlapIntegrator, VirialError> {
    build_with_extras(config, reference, target, &[])
}

/// As [`build`], with `extra_targets` observed by both chains alongside the
/// target.
pub fn build_with_extras(
    config: &OverlapConfig,
    reference: &Cluster,
    target: &Cluster,
    extra_targets: &[Cluster],
) -> Result<OverlapIntegrator, VirialError> {
    config.validate()?;
    let labelled = [("reference".to_string(), reference), ("target".to_string(), target)]
        .into_iter()
        .chain(
            extra_targets
                .iter()
                .enumerate()
                .map(|(index, cluster)| (format!("extra{index}"), cluster)),
        );
    for (label, cluster) in labelled {
        if cluster.point_count() != config.points {
            return Err(VirialError::Config(
                ErrorInfo::new("cluster-points", "cluster point count differs from the run")
                    .with_context("cluster", label)
                    .with_context("cluster_points", cluster.point_count().to_string())
                    .with_context("points", config.points.to_string()),
            ));
        }
    }

    let template = (0..config.points)
        .map(|_| {
            Molecule::linear_chain(
                Vec3::zeros(),
                config.molecule.sites,
                config.molecule.bond_length,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let seed = RingSeed {
        radius: config.seeding.radius,
    };
    let master = config.seed_policy.master_seed;

    let mut chains = Vec::with_capacity(2);
    for ensemble in Ensemble::ALL {
        let mut reference = reference.clone();
        let mut target = target.clone();
        reference.set_temperature(config.temperature)?;
        target.set_temperature(config.temperature)?;
        let mut extras: Vec<Box<dyn ClusterIntegrand>> = Vec::with_capacity(extra_targets.len());
        for cluster in extra_targets {
            let mut cluster = cluster.clone();
            cluster.set_temperature(config.temperature)?;
            extras.push(Box::new(cluster));
        }
        let cluster_box = ClusterBox::new(template.clone())?;
        let moves = MoveSet::from_config(&config.moves, &cluster_box)?;
        let mut chain = EnsembleIntegrator::new(
            ensemble,
            cluster_box,
            Box::new(reference),
            Box::new(target),
            config.weights.reference.build(),
            config.weights.target.build(),
            moves,
            RngHandle::from_seed(determinism::ensemble_seed(master, ensemble)),
        )?
        .with_extra_targets(extras);
        let mut seeding_rng = RngHandle::from_seed(determinism::seeding_seed(master, ensemble));
        chain.seed(&seed, &config.seeding, &mut seeding_rng)?;
        chains.push(chain);
    }
    let target_chain = chains.pop();
    let reference_chain = chains.pop();
    match (reference_chain, target_chain) {
        (Some(r), Some(t)) => OverlapIntegrator::new(r, t, config.sub_steps, config.block_size),
        _ => Err(VirialError::config("ensembles", "failed to build both ensembles")),
    }
}

/// Runs equilibration, calibration and production, returning the report.
///
/// `reference_integral` is the known value of the reference cluster's
/// integral; when given, the report carries full values alongside ratios.
pub fn run(
    config: &OverlapConfig,
    reference: &Cluster,
    target: &Cluster,
    reference_integral: Option<f64>,
) -> Result<OverlapReport, VirialError> {
    run_with_file(config, reference, target, reference_integral, None)
}

/// As [`run`], with the persisted preference file overriding the
/// configured one.
pub fn run_with_file(
    config: &OverlapConfig,
    reference: &Cluster,
    target: &Cluster,
    reference_integral: Option<f64>,
    preference_file: Option<PathBuf>,
) -> Result<OverlapReport, VirialError> {
    run_with_extras(config, reference, target, &[], reference_integral, preference_file)
}

/// As [`run_with_file`], additionally reporting the ratio of each of
/// `extra_targets` to the reference.
pub fn run_with_extras(
    config: &OverlapConfig,
    reference: &Cluster,
    target: &Cluster,
    extra_targets: &[Cluster],
    reference_integral: Option<f64>,
    preference_file: Option<PathBuf>,
) -> Result<OverlapReport, VirialError> {
    let mut overlap = build_with_extras(config, reference, target, extra_targets)?;

    log::info!(
        "equilibrating {} batch(es) of {} steps",
        config.equilibration,
        config.sub_steps
    );
    overlap.set_tuning(true);
    overlap.set_reference_fraction(0.5);
    overlap.set_adjust(false, 0.0);
    overlap.run(config.equilibration)?;

    let calibrator = Calibrator::new(&config.calibration, config.sub_steps, preference_file);
    let outcome = calibrator.calibrate(&mut overlap)?;

    overlap.set_tuning(false);
    overlap.reset_acceptance();
    overlap.set_alphas(AlphaGrid::single(outcome.preference.value()))?;
    overlap.set_block_size(config.block_size)?;
    overlap.set_reference_fraction(config.reference_fraction);
    overlap.set_adjust(config.adjust_fraction, config.min_reference_fraction);
    log::info!(
        "production: {} batch(es), preference {}, reference fraction {}",
        config.steps,
        outcome.preference,
        config.reference_fraction
    );
    overlap.run(config.steps)?;

    let estimate = overlap.estimate()?;
    log::info!(
        "ratio {:.6e} +/- {:.2e} ({:?})",
        estimate.ratio,
        estimate.error,
        estimate.kind
    );
    let extra_reports = (0..overlap.extra_target_count())
        .map(|index| {
            let estimate = overlap.estimate_extra(index)?;
            Ok(ExtraTargetReport::new(index, &estimate, reference_integral))
        })
        .collect::<Result<Vec<_>, VirialError>>()?;
    let reference_report = report::ensemble_report(&overlap, Ensemble::Reference, reference_integral);
    let target_report = report::ensemble_report(&overlap, Ensemble::Target, reference_integral);
    let diagnostics = report::diagnostics(&overlap, &[&reference_report, &target_report]);
    Ok(OverlapReport {
        label: config.seed_policy.label.clone(),
        points: config.points,
        temperature: config.temperature,
        estimator: estimate.kind,
        ratio: estimate.ratio,
        ratio_error: estimate.error,
        full_value: reference_integral.map(|integral| estimate.ratio * integral),
        full_value_error: reference_integral.map(|integral| estimate.error * integral.abs()),
        reference_preference: outcome.preference.value(),
        preference_source: outcome.source,
        reference_fraction: overlap.reference_fraction(),
        reference: reference_report,
        target: target_report,
        extra_targets: extra_reports,
        diagnostics,
    })
}
