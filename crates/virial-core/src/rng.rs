//! Deterministic RNG wrapper and seed-derivation helpers.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle threaded through every stochastic component.
///
/// The handle wraps `StdRng` and documents the seeding policy of the
/// workspace. A master `seed: u64` is supplied by the caller; substreams are
/// derived by hashing `(master_seed, substream_id)` with SipHash-1-3 keyed
/// with zeros. There is no process-wide generator.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates the handle for a derived substream of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Uniform draw from `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw from `[-half_width, half_width)`.
    pub fn symmetric(&mut self, half_width: f64) -> f64 {
        (2.0 * self.uniform() - 1.0) * half_width
    }

    /// Uniform index in `0..len`. `len` must be nonzero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniformly distributed point on the unit sphere (Marsaglia).
    pub fn unit_vector(&mut self) -> Unit<Vector3<f64>> {
        loop {
            let a = self.symmetric(1.0);
            let b = self.symmetric(1.0);
            let s = a * a + b * b;
            if s >= 1.0 || s == 0.0 {
                continue;
            }
            let root = (1.0 - s).sqrt();
            return Unit::new_unchecked(Vector3::new(
                2.0 * a * root,
                2.0 * b * root,
                1.0 - 2.0 * s,
            ));
        }
    }

    /// Rotation about a uniformly random axis by an angle drawn from
    /// `[-max_angle, max_angle)`. The distribution is symmetric under inversion.
    pub fn small_rotation(&mut self, max_angle: f64) -> UnitQuaternion<f64> {
        let axis = self.unit_vector();
        let angle = self.symmetric(max_angle);
        UnitQuaternion::from_axis_angle(&axis, angle)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
