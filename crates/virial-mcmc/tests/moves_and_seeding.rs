use virial_cluster::{f_bond, AbsoluteValue, Cluster, HardSphere, Side, SquareWell};
use virial_core::{ClusterBox, Molecule, PairGeometry, Potential, RngHandle, Vec3, VirialError};
use virial_mcmc::config::MoveConfig;
use virial_mcmc::moves::build_move;
use virial_mcmc::{
    build, run, ConfigurationSeed, Ensemble, EnsembleIntegrator, MoveEntry, MoveKind, MoveSet,
    OverlapConfig, RingSeed, SeedingConfig, StepPhase, StepTracker,
};

fn chains() -> ClusterBox {
    ClusterBox::new(vec![
        Molecule::linear_chain(Vec3::zeros(), 5, 1.0).unwrap(),
        Molecule::linear_chain(Vec3::new(0.0, 1.0, 0.0), 5, 1.0).unwrap(),
        Molecule::atom(Vec3::new(0.0, -1.0, 0.0)),
    ])
    .unwrap()
}

fn bond_lengths(molecule: &Molecule) -> Vec<f64> {
    molecule
        .sites()
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).norm())
        .collect()
}

fn exercise(kind: MoveKind, trials: usize) -> ClusterBox {
    let mut cluster_box = chains();
    let mut proposal = build_move(&MoveEntry::new(kind), &MoveConfig::default()).unwrap();
    let mut rng = RngHandle::from_seed(17);
    for _ in 0..trials {
        cluster_box.begin_trial();
        assert!(proposal.propose(&mut cluster_box, &mut rng));
        cluster_box.commit();
    }
    cluster_box
}

#[test]
fn chain_moves_preserve_bond_lengths() {
    for kind in [MoveKind::Wiggle, MoveKind::Reptate, MoveKind::AngleBend, MoveKind::Rotate] {
        let cluster_box = exercise(kind, 500);
        for molecule in cluster_box.molecules() {
            for length in bond_lengths(molecule) {
                assert!((length - 1.0).abs() < 1e-9, "{kind:?} bond {length}");
            }
        }
    }
}

#[test]
fn chain_moves_change_the_geometry() {
    let original = chains();
    for kind in [MoveKind::Wiggle, MoveKind::Reptate, MoveKind::AngleBend] {
        let moved = exercise(kind, 50);
        assert_ne!(moved.molecules(), original.molecules(), "{kind:?}");
    }
}

#[test]
fn translations_keep_the_first_molecule_fixed() {
    for kind in [MoveKind::Translate, MoveKind::TranslateAll] {
        let moved = exercise(kind, 200);
        assert_eq!(moved.molecule(0), chains().molecule(0));
        assert_ne!(moved.molecule(2), chains().molecule(2));
    }
}

#[test]
fn inapplicable_moves_are_rejected_at_construction() {
    let atoms = ClusterBox::atoms(3).unwrap();
    let mut config = MoveConfig::default();
    config.entries = vec![MoveEntry::new(MoveKind::AngleBend)];
    let err = MoveSet::from_config(&config, &atoms).unwrap_err();
    assert!(matches!(err, VirialError::Config(_)));
    assert_eq!(err.info().code, "move-inapplicable");

    config.entries = vec![MoveEntry::new(MoveKind::Translate), MoveEntry::new(MoveKind::Rotate)];
    let set = MoveSet::from_config(&config, &atoms).unwrap();
    assert_eq!(set.len(), 2);
}

#[test]
fn move_selection_follows_frequencies() {
    let atoms = ClusterBox::atoms(3).unwrap();
    let mut config = MoveConfig::default();
    let mut rare = MoveEntry::new(MoveKind::Rotate);
    rare.frequency = 1.0;
    let mut common = MoveEntry::new(MoveKind::Translate);
    common.frequency = 3.0;
    config.entries = vec![rare, common];
    let set = MoveSet::from_config(&config, &atoms).unwrap();
    let mut rng = RngHandle::from_seed(5);
    let picks = (0..10_000).filter(|_| set.select(&mut rng) == 1).count();
    assert!((7_000..8_000).contains(&picks), "{picks}");
}

#[test]
fn ring_seed_centres_molecules_on_the_circle() {
    let seed = RingSeed { radius: 0.25 };
    let mut rng = RngHandle::from_seed(1);
    let placed = seed.place(chains().molecules(), &mut rng);
    assert!(placed[0].centre().norm() < 1e-12);
    for molecule in &placed[1..] {
        assert!((molecule.centre().norm() - 0.25).abs() < 1e-12);
    }
}

#[test]
fn unreachable_seed_is_a_degenerate_configuration() {
    let hs = Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let mut config = OverlapConfig::default();
    config.seeding.radius = 10.0;
    config.seeding.perturbation = 0.01;
    config.seeding.max_retries = 5;
    let err = build(&config, &hs, &hs).unwrap_err();
    assert!(matches!(err, VirialError::DegenerateConfiguration(_)), "{err}");
    assert_eq!(err.info().code, "seed-exhausted");
}

#[test]
fn mismatched_point_counts_are_config_errors() {
    let hs3 = Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let hs4 = Cluster::biconnected(4, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let config = OverlapConfig::default();
    let err = build(&config, &hs3, &hs4).unwrap_err();
    assert_eq!(err.info().code, "cluster-points");
}

#[test]
fn steps_emit_records_and_return_to_idle() {
    let hs = Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let well = Cluster::biconnected(
        3,
        f_bond(SquareWell {
            sigma: 0.5,
            lambda: 2.0,
            epsilon: 1.0,
        }),
    )
    .unwrap();
    let mut overlap = build(&OverlapConfig::default(), &hs, &well).unwrap();
    overlap.run(3).unwrap();
    for ensemble in virial_mcmc::Ensemble::ALL {
        let chain = overlap.integrator(ensemble);
        assert_eq!(chain.phase(), StepPhase::Idle);
        assert!(chain.current().weight(ensemble) > 0.0);
    }
    assert_eq!(
        overlap.integrator(virial_mcmc::Ensemble::Reference).steps()
            + overlap.integrator(virial_mcmc::Ensemble::Target).steps(),
        3000
    );
}

#[test]
fn tracker_grows_step_when_acceptance_is_high() {
    let mut tracker = StepTracker::new(0.5, 0.01, 10.0, 0.5, 10);
    for _ in 0..100 {
        tracker.record(true);
    }
    assert!(tracker.step() > 0.5);
    assert_eq!(tracker.acceptance(), 1.0);
    assert!(tracker.converged());

    tracker.set_tuning(false);
    let frozen = tracker.step();
    for _ in 0..100 {
        tracker.record(false);
    }
    assert_eq!(tracker.step(), frozen);
}

#[test]
fn tracker_pinned_on_a_clamp_reports_nonconvergence() {
    let mut tracker = StepTracker::new(1.0, 0.1, 1.2, 0.5, 10);
    for _ in 0..200 {
        tracker.record(true);
    }
    assert_eq!(tracker.step(), 1.2);
    assert!(!tracker.converged());
}

#[test]
fn fixed_tracker_only_counts() {
    let mut tracker = StepTracker::fixed();
    tracker.record(true);
    tracker.record(false);
    assert_eq!(tracker.step(), 0.0);
    assert_eq!(tracker.acceptance(), 0.5);
    assert!(tracker.converged());
}

#[test]
fn one_sided_step_bound_is_resolved_against_the_default() {
    let mut entry = MoveEntry::new(MoveKind::Translate);
    entry.min_step = Some(20.0);
    let err = build_move(&entry, &MoveConfig::default()).unwrap_err();
    assert_eq!(err.info().code, "move-step-bounds");

    let mut config = OverlapConfig::default();
    config.moves.entries = vec![entry];
    let err = config.validate().unwrap_err();
    assert!(matches!(err, VirialError::Config(_)));
    assert_eq!(err.info().code, "move-step-bounds");

    let hs = Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap();
    let err = run(&config, &hs, &hs, None).unwrap_err();
    assert_eq!(err.info().code, "move-step-bounds");
}

#[test]
fn invalid_initial_steps_are_config_errors() {
    for step in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let mut entry = MoveEntry::new(MoveKind::Rotate);
        entry.step = Some(step);
        let mut config = OverlapConfig::default();
        config.moves.entries = vec![entry];
        assert_eq!(config.validate().unwrap_err().info().code, "move-step", "{step}");
    }
    let mut entry = MoveEntry::new(MoveKind::Reptate);
    entry.min_step = Some(20.0);
    assert!(build_move(&entry, &MoveConfig::default()).is_ok());
}

#[test]
fn tracker_with_inverted_bounds_collapses_to_the_lower_one() {
    let mut tracker = StepTracker::new(0.5, 20.0, 10.0, 0.5, 10);
    assert_eq!(tracker.step(), 20.0);
    for _ in 0..50 {
        tracker.record(false);
    }
    assert_eq!(tracker.step(), 20.0);
}

/// `u = -1` within `reach`, undefined beyond it.
#[derive(Debug)]
struct Tethered {
    reach: f64,
}

impl Potential for Tethered {
    fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
        if pair.r2 < self.reach * self.reach {
            -1.0
        } else {
            f64::NAN
        }
    }
}

fn tethered(reach: f64) -> Cluster {
    Cluster::biconnected(3, f_bond(Tethered { reach })).unwrap()
}

fn hard_spheres() -> Cluster {
    Cluster::biconnected(3, f_bond(HardSphere { sigma: 1.0 })).unwrap()
}

fn integrator(ensemble: Ensemble, reference: Cluster, target: Cluster, moves: &MoveConfig) -> EnsembleIntegrator {
    let cluster_box = ClusterBox::atoms(3).unwrap();
    let moves = MoveSet::from_config(moves, &cluster_box).unwrap();
    EnsembleIntegrator::new(
        ensemble,
        cluster_box,
        Box::new(reference),
        Box::new(target),
        Box::new(AbsoluteValue(Side::Reference)),
        Box::new(AbsoluteValue(Side::Target)),
        moves,
        RngHandle::from_seed(11),
    )
    .unwrap()
}

#[test]
fn non_finite_seed_geometry_is_a_numeric_overflow() {
    let err = build(&OverlapConfig::default(), &hard_spheres(), &tethered(0.0)).unwrap_err();
    assert!(matches!(err, VirialError::NumericOverflow(_)), "{err}");
    assert_eq!(err.info().code, "seed-overflow");
}

#[test]
fn stepping_from_a_non_finite_geometry_is_fatal() {
    let mut chain = integrator(
        Ensemble::Reference,
        tethered(0.0),
        hard_spheres(),
        &MoveConfig::default(),
    );
    assert!(!chain.current().values.reference.is_finite());
    let err = chain.step().unwrap_err();
    assert!(matches!(err, VirialError::NumericOverflow(_)), "{err}");
    assert_eq!(err.info().code, "current-weight");
    assert_eq!(chain.steps(), 0);
}

#[test]
fn non_finite_candidates_are_rejected_locally() {
    let reach = 1.5;
    let mut moves = MoveConfig::default();
    let mut wide = MoveEntry::new(MoveKind::TranslateAll);
    wide.step = Some(2.0);
    moves.entries = vec![wide];
    let mut chain = integrator(Ensemble::Target, hard_spheres(), tethered(reach), &moves);
    let mut rng = RngHandle::from_seed(3);
    chain
        .seed(&RingSeed { radius: 0.25 }, &SeedingConfig::default(), &mut rng)
        .unwrap();

    let (mut accepted, mut rejected) = (0, 0);
    for _ in 0..2_000 {
        let record = chain.step().unwrap();
        if record.accepted {
            accepted += 1;
        } else {
            rejected += 1;
        }
        assert!(record.measurement.values.target.is_finite());
        let centres: Vec<Vec3> = chain.cluster_box().molecules().iter().map(Molecule::centre).collect();
        for i in 0..centres.len() {
            for j in i + 1..centres.len() {
                assert!((centres[i] - centres[j]).norm() < reach);
            }
        }
    }
    assert!(accepted > 0, "no candidate inside the reach was accepted");
    assert!(rejected > 0, "no candidate beyond the reach was proposed");
}
