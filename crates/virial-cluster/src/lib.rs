#![deny(missing_docs)]

//! Cluster integrands for Mayer-sampling virial calculations.

/// Recursive sum over all biconnected diagrams.
pub mod biconnected;
/// Diagram representations and the cached cluster integrand.
pub mod cluster;
/// Explicit bond-list diagrams and diagram generators.
pub mod diagram;
/// Tabulated hard-sphere virial coefficients.
pub mod hard_sphere;
/// Mayer f- and e-bond functions and the shared bond table.
pub mod mayer;
/// Bundled model pair potentials.
pub mod potentials;
/// Sampling weights and the overlap integrand.
pub mod weight;

pub use biconnected::{virial_prefactor, BiconnectedSum};
pub use cluster::{Cluster, ClusterDiagram, ClusterIntegrand};
pub use diagram::{biconnected_diagrams, DiagramSum, Edge, ExplicitDiagram};
pub use mayer::{e_bond, f_bond, Bond, BondTable, MayerE, MayerF, MayerFunction};
pub use potentials::{Centre, HardSphere, LennardJones, ModelSpec, SiteSite, SoftRamp, Spherical, SquareWell};
pub use weight::{overlap_value, AbsoluteValue, ClusterValues, SamplingWeight, Side, Umbrella, WeightSpec};
