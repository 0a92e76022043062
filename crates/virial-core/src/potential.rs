//! Interaction capability consumed by Mayer bonds.

use std::fmt::Debug;
use std::sync::Arc;

use crate::geometry::Molecule;

/// Geometry of one interacting pair.
#[derive(Debug, Clone, Copy)]
pub struct PairGeometry<'a> {
    /// First molecule of the pair.
    pub first: &'a Molecule,
    /// Second molecule of the pair.
    pub second: &'a Molecule,
    /// Squared centre-centre distance.
    pub r2: f64,
}

/// Pair interaction energy. Implementations may return `+inf` (overlap),
/// `-inf` or NaN; callers propagate whatever is returned.
pub trait Potential: Debug + Send + Sync {
    /// Energy of the pair in units of `k_B`.
    fn energy(&self, pair: &PairGeometry<'_>) -> f64;
}

impl<P: Potential + ?Sized> Potential for Arc<P> {
    fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
        (**self).energy(pair)
    }
}

impl<P: Potential + ?Sized> Potential for Box<P> {
    fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
        (**self).energy(pair)
    }
}
