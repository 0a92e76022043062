//! Explicit cluster diagrams and the biconnected-graph generator.

use serde::{Deserialize, Serialize};
use virial_core::{ErrorInfo, VirialError};

use crate::mayer::BondTable;

/// One edge of a diagram: points `i`, `j` joined by bond function `bond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// First point label.
    pub i: usize,
    /// Second point label.
    pub j: usize,
    /// Index into the cluster's bond-function list.
    pub bond: usize,
}

/// A single product of bonds with a prefactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitDiagram {
    /// Multiplier applied to the bond product.
    pub prefactor: f64,
    /// Bonds multiplied together.
    pub edges: Vec<Edge>,
}

impl ExplicitDiagram {
    /// Product of the bond values times the prefactor.
    pub fn value(&self, table: &BondTable) -> f64 {
        self.edges
            .iter()
            .fold(self.prefactor, |acc, edge| acc * table.get(edge.bond, edge.i, edge.j))
    }
}

/// A signed sum of explicit diagrams over a shared set of bond functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramSum {
    points: usize,
    diagrams: Vec<ExplicitDiagram>,
}

impl DiagramSum {
    /// Builds the sum, checking every edge against `points` and `bond_count`.
    pub fn new(
        points: usize,
        bond_count: usize,
        diagrams: Vec<ExplicitDiagram>,
    ) -> Result<Self, VirialError> {
        for (index, diagram) in diagrams.iter().enumerate() {
            for edge in &diagram.edges {
                if edge.i >= points || edge.j >= points || edge.i == edge.j {
                    return Err(VirialError::Config(
                        ErrorInfo::new("diagram-edge", "edge endpoints out of range")
                            .with_context("diagram", index.to_string())
                            .with_context("edge", format!("{}-{}", edge.i, edge.j)),
                    ));
                }
                if edge.bond >= bond_count {
                    return Err(VirialError::Config(
                        ErrorInfo::new("diagram-bond", "edge references an unknown bond")
                            .with_context("diagram", index.to_string())
                            .with_context("bond", edge.bond.to_string()),
                    ));
                }
            }
        }
        Ok(Self { points, diagrams })
    }

    /// Number of labelled points.
    pub fn points(&self) -> usize {
        self.points
    }

    /// Diagrams in the sum.
    pub fn diagrams(&self) -> &[ExplicitDiagram] {
        &self.diagrams
    }

    /// Sum of all diagram values.
    pub fn value(&self, table: &BondTable) -> f64 {
        self.diagrams.iter().map(|diagram| diagram.value(table)).sum()
    }
}

fn pair_list(n: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }
    pairs
}

fn connected_without(n: usize, edges: &[(usize, usize)], removed: Option<usize>) -> bool {
    let start = match (0..n).find(|&v| Some(v) != removed) {
        Some(start) => start,
        None => return true,
    };
    let mut seen = vec![false; n];
    let mut stack = vec![start];
    seen[start] = true;
    while let Some(v) = stack.pop() {
        for &(a, b) in edges {
            if Some(a) == removed || Some(b) == removed {
                continue;
            }
            let other = if a == v {
                b
            } else if b == v {
                a
            } else {
                continue;
            };
            if !seen[other] {
                seen[other] = true;
                stack.push(other);
            }
        }
    }
    (0..n).all(|v| seen[v] || Some(v) == removed)
}

/// Whether the graph on `n` labelled points is biconnected: connected and
/// free of articulation points. A single edge on two points counts.
pub fn is_biconnected(n: usize, edges: &[(usize, usize)]) -> bool {
    if n < 2 || !connected_without(n, edges, None) {
        return false;
    }
    if n == 2 {
        return true;
    }
    (0..n).all(|v| connected_without(n, edges, Some(v)))
}

/// Every labelled biconnected graph on `n` points as explicit f-bond
/// diagrams over bond function 0, each with `prefactor`.
///
/// The count grows as `2^(n(n-1)/2)`; use the recursive sum beyond n = 6.
pub fn biconnected_diagrams(n: usize, prefactor: f64) -> Vec<ExplicitDiagram> {
    let pairs = pair_list(n);
    let mut out = Vec::new();
    let total: u64 = 1 << pairs.len();
    for mask in 1..total {
        let edges: Vec<(usize, usize)> = pairs
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, &pair)| pair)
            .collect();
        if is_biconnected(n, &edges) {
            out.push(ExplicitDiagram {
                prefactor,
                edges: edges
                    .into_iter()
                    .map(|(i, j)| Edge { i, j, bond: 0 })
                    .collect(),
            });
        }
    }
    out
}

/// The ring diagram `f01 f12 ... f(n-1)0` over bond function 0.
pub fn ring_diagram(n: usize, prefactor: f64) -> ExplicitDiagram {
    let edges = (0..n)
        .map(|i| Edge {
            i,
            j: (i + 1) % n,
            bond: 0,
        })
        .collect();
    ExplicitDiagram { prefactor, edges }
}

/// The fully connected diagram on `n` points over bond function 0.
pub fn complete_diagram(n: usize, prefactor: f64) -> ExplicitDiagram {
    let edges = pair_list(n)
        .into_iter()
        .map(|(i, j)| Edge { i, j, bond: 0 })
        .collect();
    ExplicitDiagram { prefactor, edges }
}
