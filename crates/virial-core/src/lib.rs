#![deny(missing_docs)]
#![doc = "Core geometry, error, RNG and potential types shared by the virial overlap sampler."]

pub mod errors;
pub mod geometry;
pub mod potential;
pub mod rng;

pub use errors::{Diagnostic, ErrorInfo, VirialError};
pub use geometry::{BoxGeometry, ClusterBox, Molecule, PairSet, Vec3};
pub use potential::{PairGeometry, Potential};
pub use rng::{derive_substream_seed, RngHandle};
