use std::f64::consts::TAU;
use std::fmt::Debug;

use virial_core::{Molecule, RngHandle, Vec3};

/// Provider of starting geometries.
///
/// `place` receives the molecules currently in the box and returns a
/// replacement of the same length. Validation of the returned geometry is
/// left to the caller.
pub trait ConfigurationSeed: Debug {
    /// Places the molecules.
    fn place(&self, molecules: &[Molecule], rng: &mut RngHandle) -> Vec<Molecule>;

    /// Randomly displaces every molecule but the first by up to `scale`
    /// along each axis. Called between failed validation attempts.
    fn perturb(&self, molecules: &[Molecule], scale: f64, rng: &mut RngHandle) -> Vec<Molecule> {
        molecules
            .iter()
            .enumerate()
            .map(|(index, molecule)| {
                let mut moved = molecule.clone();
                if index > 0 {
                    let delta = Vec3::new(
                        rng.symmetric(scale),
                        rng.symmetric(scale),
                        rng.symmetric(scale),
                    );
                    moved.translate(&delta);
                }
                moved
            })
            .collect()
    }
}

/// Molecule 0 at the origin, the others evenly spaced on a circle of
/// `radius` in the xy plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSeed {
    /// Circle radius.
    pub radius: f64,
}

impl ConfigurationSeed for RingSeed {
    fn place(&self, molecules: &[Molecule], _rng: &mut RngHandle) -> Vec<Molecule> {
        let others = molecules.len().saturating_sub(1).max(1) as f64;
        molecules
            .iter()
            .enumerate()
            .map(|(index, molecule)| {
                let target = if index == 0 {
                    Vec3::zeros()
                } else {
                    let angle = TAU * (index - 1) as f64 / others;
                    Vec3::new(self.radius * angle.cos(), self.radius * angle.sin(), 0.0)
                };
                let mut placed = molecule.clone();
                let delta = target - placed.centre();
                placed.translate(&delta);
                placed
            })
            .collect()
    }
}
