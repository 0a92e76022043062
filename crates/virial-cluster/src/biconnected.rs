//! Recursive sum over all biconnected diagrams on N labelled points.
//!
//! Subsets of points are bitmasks. Three tables are built bottom-up for a
//! single geometry: products of e-bonds over every subset, the connected
//! sum over every subset, and finally the biconnected sum obtained by
//! removing, point by point, every diagram with an articulation point at
//! that point. Work is `O(N 3^N)` with `O(2^N)` memory.

use serde::{Deserialize, Serialize};
use virial_core::{ErrorInfo, VirialError};

use crate::mayer::BondTable;

/// Largest point count the subset tables are allowed to grow to.
pub const MAX_POINTS: usize = 20;

/// Implicit "all biconnected diagrams" cluster over one f-bond function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiconnectedSum {
    points: usize,
    bond: usize,
    prefactor: f64,
    #[serde(skip)]
    scratch: Scratch,
}

#[derive(Debug, Clone, Default)]
struct Scratch {
    product: Vec<f64>,
    connected: Vec<f64>,
    biconnected: Vec<f64>,
    articulated: Vec<f64>,
}

impl BiconnectedSum {
    /// Sum with prefactor 1.
    pub fn raw(points: usize, bond: usize) -> Result<Self, VirialError> {
        Self::with_prefactor(points, bond, 1.0)
    }

    /// Sum scaled by the virial prefactor `(1 - n) / n!`, so that the
    /// integral of the value is the n-th virial coefficient.
    pub fn virial(points: usize, bond: usize) -> Result<Self, VirialError> {
        Self::with_prefactor(points, bond, virial_prefactor(points))
    }

    /// Sum with an arbitrary prefactor.
    pub fn with_prefactor(points: usize, bond: usize, prefactor: f64) -> Result<Self, VirialError> {
        if !(2..=MAX_POINTS).contains(&points) {
            return Err(VirialError::Config(
                ErrorInfo::new("biconnected-points", "point count outside supported range")
                    .with_context("points", points.to_string())
                    .with_context("max", MAX_POINTS.to_string()),
            ));
        }
        Ok(Self {
            points,
            bond,
            prefactor,
            scratch: Scratch::default(),
        })
    }

    /// Number of labelled points.
    pub fn points(&self) -> usize {
        self.points
    }

    /// Index of the f-bond function in the cluster's bond list.
    pub fn bond(&self) -> usize {
        self.bond
    }

    /// Multiplier applied to the biconnected sum.
    pub fn prefactor(&self) -> f64 {
        self.prefactor
    }

    /// Evaluates the prefactor times the biconnected sum for the geometry
    /// captured in `table`.
    pub fn value(&mut self, table: &BondTable) -> f64 {
        let n = self.points;
        let full = (1usize << n) - 1;
        let size = full + 1;
        let bond = self.bond;
        let Scratch {
            product,
            connected,
            biconnected,
            articulated,
        } = &mut self.scratch;
        for buffer in [&mut *product, &mut *connected, &mut *biconnected, &mut *articulated] {
            buffer.clear();
            buffer.resize(size, 0.0);
        }

        // Products of e = f + 1 over every pair inside each subset.
        for set in 1..size {
            let low = set.trailing_zeros() as usize;
            let rest = set & (set - 1);
            if rest == 0 {
                product[set] = 1.0;
                continue;
            }
            let mut value = product[rest];
            let mut others = rest;
            while others != 0 {
                let j = others.trailing_zeros() as usize;
                value *= table.get(bond, low, j) + 1.0;
                others &= others - 1;
            }
            product[set] = value;
        }

        // Connected sums: subtract every split that leaves the lowest point
        // in a connected component smaller than the set.
        for set in 1..size {
            let low = set & set.wrapping_neg();
            let free = set & !low;
            let mut value = product[set];
            if free != 0 {
                let mut sub = free;
                loop {
                    sub = (sub.wrapping_sub(1)) & free;
                    let part = low | sub;
                    value -= connected[part] * product[set & !part];
                    if sub == 0 {
                        break;
                    }
                }
            }
            connected[set] = value;
        }

        biconnected.copy_from_slice(&connected[..]);

        // Remove diagrams with an articulation point at each point in turn.
        for v in 0..n {
            let vbit = 1usize << v;
            for set in 1..size {
                articulated[set] = 0.0;
                if set & vbit == 0 {
                    continue;
                }
                let rest = set & !vbit;
                if rest == 0 || rest & (rest - 1) == 0 {
                    continue;
                }
                let anchor = vbit | (rest & rest.wrapping_neg());
                let free = set & !anchor;
                let mut removed = 0.0;
                let mut sub = free;
                loop {
                    sub = (sub.wrapping_sub(1)) & free;
                    let block = anchor | sub;
                    let tail = (set & !block) | vbit;
                    removed += biconnected[block] * (biconnected[tail] + articulated[tail]);
                    if sub == 0 {
                        break;
                    }
                }
                articulated[set] = removed;
                biconnected[set] -= removed;
            }
        }

        self.prefactor * biconnected[full]
    }
}

/// `(1 - n) / n!`.
pub fn virial_prefactor(points: usize) -> f64 {
    let factorial: f64 = (1..=points).map(|k| k as f64).product();
    (1.0 - points as f64) / factorial
}
