use virial_core::derive_substream_seed;

use crate::ensemble::Ensemble;

/// Derives the deterministic seed used by one ensemble's move proposer.
pub fn ensemble_seed(master_seed: u64, ensemble: Ensemble) -> u64 {
    derive_substream_seed(master_seed, ensemble.index() as u64)
}

/// Derives the seed used while placing and validating an ensemble's
/// starting geometry.
pub fn seeding_seed(master_seed: u64, ensemble: Ensemble) -> u64 {
    derive_substream_seed(
        master_seed ^ 0xA5A5_A5A5_A5A5_A5A5,
        ensemble.index() as u64,
    )
}
