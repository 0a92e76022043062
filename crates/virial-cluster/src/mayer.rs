//! Mayer bond functions and the per-geometry bond table.

use std::fmt::Debug;
use std::sync::Arc;

use virial_core::{BoxGeometry, PairGeometry, Potential};

/// A pairwise bond evaluated at inverse temperature `beta`.
pub trait MayerFunction: Debug + Send + Sync {
    /// Bond value for one pair.
    fn value(&self, pair: &PairGeometry<'_>, beta: f64) -> f64;
}

/// `f = exp(-beta u) - 1`.
#[derive(Debug, Clone)]
pub struct MayerF<P> {
    potential: P,
}

impl<P: Potential> MayerF<P> {
    /// Wraps `potential` as an f-bond.
    pub fn new(potential: P) -> Self {
        Self { potential }
    }
}

impl<P: Potential> MayerFunction for MayerF<P> {
    fn value(&self, pair: &PairGeometry<'_>, beta: f64) -> f64 {
        (-beta * self.potential.energy(pair)).exp() - 1.0
    }
}

/// `e = exp(-beta u)`.
#[derive(Debug, Clone)]
pub struct MayerE<P> {
    potential: P,
}

impl<P: Potential> MayerE<P> {
    /// Wraps `potential` as an e-bond.
    pub fn new(potential: P) -> Self {
        Self { potential }
    }
}

impl<P: Potential> MayerFunction for MayerE<P> {
    fn value(&self, pair: &PairGeometry<'_>, beta: f64) -> f64 {
        (-beta * self.potential.energy(pair)).exp()
    }
}

/// Shared handle to a bond function.
pub type Bond = Arc<dyn MayerFunction>;

/// Convenience constructor for a shared f-bond.
pub fn f_bond<P: Potential + 'static>(potential: P) -> Bond {
    Arc::new(MayerF::new(potential))
}

/// Convenience constructor for a shared e-bond.
pub fn e_bond<P: Potential + 'static>(potential: P) -> Bond {
    Arc::new(MayerE::new(potential))
}

/// Values of every bond function for every pair of one geometry.
///
/// Each function is evaluated once per pair and reused by all diagrams that
/// reference it.
#[derive(Debug, Clone, Default)]
pub struct BondTable {
    points: usize,
    values: Vec<Vec<f64>>,
}

impl BondTable {
    /// Recomputes the table for `geometry`.
    pub fn fill(&mut self, bonds: &[Bond], geometry: &BoxGeometry<'_>, beta: f64) {
        let n = geometry.molecules.len();
        self.points = n;
        self.values.resize_with(bonds.len(), Vec::new);
        for (bond, table) in bonds.iter().zip(self.values.iter_mut()) {
            table.clear();
            table.resize(n * n, 0.0);
            for i in 0..n {
                for j in (i + 1)..n {
                    let pair = PairGeometry {
                        first: &geometry.molecules[i],
                        second: &geometry.molecules[j],
                        r2: geometry.pairs.r2(i, j),
                    };
                    let value = bond.value(&pair, beta);
                    table[i * n + j] = value;
                    table[j * n + i] = value;
                }
            }
        }
    }

    /// Value of bond function `bond` between points `i` and `j`.
    pub fn get(&self, bond: usize, i: usize, j: usize) -> f64 {
        self.values[bond][i * self.points + j]
    }

    /// Number of points the table was filled for.
    pub fn points(&self) -> usize {
        self.points
    }
}
