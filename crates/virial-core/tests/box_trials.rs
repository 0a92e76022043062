use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use proptest::prelude::*;
use virial_core::{ClusterBox, Molecule, Vec3};

fn three_atoms() -> ClusterBox {
    ClusterBox::new(vec![
        Molecule::atom(Vec3::zeros()),
        Molecule::atom(Vec3::new(1.0, 0.0, 0.0)),
        Molecule::atom(Vec3::new(0.0, 2.0, 0.0)),
    ])
    .unwrap()
}

#[test]
fn empty_box_is_rejected() {
    assert!(ClusterBox::new(Vec::new()).is_err());
}

#[test]
fn pair_distances_follow_geometry() {
    let mut cluster = three_atoms();
    let geometry = cluster.geometry();
    assert_relative_eq!(geometry.pairs.r2(0, 1), 1.0);
    assert_relative_eq!(geometry.pairs.r2(0, 2), 4.0);
    assert_relative_eq!(geometry.pairs.r2(1, 2), 5.0);
    assert_relative_eq!(geometry.pairs.r2(2, 1), 5.0);
}

#[test]
fn revert_restores_geometry_and_version() {
    let mut cluster = three_atoms();
    let before = cluster.version();
    cluster.begin_trial();
    cluster
        .molecule_mut(1)
        .translate(&Vec3::new(0.5, 0.0, 0.0));
    assert_ne!(cluster.version(), before);
    assert_relative_eq!(cluster.geometry().pairs.r2(0, 1), 2.25);
    cluster.revert();
    assert_eq!(cluster.version(), before);
    assert_relative_eq!(cluster.geometry().pairs.r2(0, 1), 1.0);
}

#[test]
fn commit_keeps_new_version() {
    let mut cluster = three_atoms();
    cluster.begin_trial();
    let trial_version = cluster.version();
    cluster.molecule_mut(2).translate(&Vec3::new(0.0, -1.0, 0.0));
    cluster.commit();
    assert_eq!(cluster.version(), trial_version);
    assert!(!cluster.in_trial());
    assert_relative_eq!(cluster.geometry().pairs.r2(0, 2), 1.0);
}

#[test]
fn versions_are_never_reused_after_revert() {
    let mut cluster = three_atoms();
    cluster.begin_trial();
    let first = cluster.version();
    cluster.revert();
    cluster.begin_trial();
    assert_ne!(cluster.version(), first);
}

#[test]
fn rotation_preserves_internal_distances() {
    let mut chain = Molecule::linear_chain(Vec3::new(1.0, 1.0, 1.0), 4, 1.0).unwrap();
    let centre = chain.centre();
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
    chain.rotate(&rotation);
    assert_relative_eq!(chain.centre(), centre, epsilon = 1e-12);
    for pair in chain.sites().windows(2) {
        assert_relative_eq!((pair[1] - pair[0]).norm(), 1.0, epsilon = 1e-12);
    }
}

proptest! {
    #[test]
    fn any_reverted_trial_is_a_no_op(dx in -2.0f64..2.0, dy in -2.0f64..2.0, index in 0usize..3) {
        let mut cluster = three_atoms();
        let original: Vec<Molecule> = cluster.molecules().to_vec();
        cluster.begin_trial();
        cluster.molecule_mut(index).translate(&Vec3::new(dx, dy, 0.0));
        cluster.molecule_mut(index).translate(&Vec3::new(dy, dx, 1.0));
        cluster.revert();
        prop_assert_eq!(cluster.molecules(), &original[..]);
    }
}
