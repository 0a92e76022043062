//! Model pair potentials used by the bundled drivers and tests.

use serde::{Deserialize, Serialize};
use virial_core::{PairGeometry, Potential};

/// Isotropic potential of a squared distance.
pub trait Spherical: std::fmt::Debug + Send + Sync {
    /// Energy at squared separation `r2`.
    fn u(&self, r2: f64) -> f64;
}

/// Hard spheres of diameter `sigma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardSphere {
    /// Diameter.
    pub sigma: f64,
}

impl Spherical for HardSphere {
    fn u(&self, r2: f64) -> f64 {
        if r2 < self.sigma * self.sigma {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

/// Hard core of diameter `sigma` with an attractive well of depth `epsilon`
/// out to `lambda * sigma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareWell {
    /// Core diameter.
    pub sigma: f64,
    /// Well range in units of `sigma`.
    pub lambda: f64,
    /// Well depth.
    pub epsilon: f64,
}

impl Spherical for SquareWell {
    fn u(&self, r2: f64) -> f64 {
        let s2 = self.sigma * self.sigma;
        if r2 < s2 {
            f64::INFINITY
        } else if r2 < self.lambda * self.lambda * s2 {
            -self.epsilon
        } else {
            0.0
        }
    }
}

/// 12-6 Lennard-Jones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LennardJones {
    /// Zero-crossing distance.
    pub sigma: f64,
    /// Well depth.
    pub epsilon: f64,
}

impl Spherical for LennardJones {
    fn u(&self, r2: f64) -> f64 {
        let s6 = (self.sigma * self.sigma / r2).powi(3);
        4.0 * self.epsilon * (s6 * s6 - s6)
    }
}

/// Linear repulsive ramp `epsilon (1 - r/sigma)` inside `sigma`, zero beyond.
/// Its Mayer function vanishes exactly where the hard-sphere one does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftRamp {
    /// Range.
    pub sigma: f64,
    /// Energy at contact.
    pub epsilon: f64,
}

impl Spherical for SoftRamp {
    fn u(&self, r2: f64) -> f64 {
        if r2 < self.sigma * self.sigma {
            self.epsilon * (1.0 - r2.sqrt() / self.sigma)
        } else {
            0.0
        }
    }
}

macro_rules! centre_potential {
    ($($ty:ty),*) => {
        $(
            impl Potential for $ty {
                fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
                    self.u(pair.r2)
                }
            }
        )*
    };
}

centre_potential!(HardSphere, SquareWell, LennardJones, SoftRamp);

/// Applies any spherical potential to centre-centre distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centre<S>(pub S);

impl<S: Spherical> Potential for Centre<S> {
    fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
        self.0.u(pair.r2)
    }
}

/// Sums a spherical site potential over every site pair of two molecules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteSite<S> {
    /// Potential acting between individual sites.
    pub site: S,
}

impl<S: Spherical> Potential for SiteSite<S> {
    fn energy(&self, pair: &PairGeometry<'_>) -> f64 {
        let mut total = 0.0;
        for a in pair.first.sites() {
            for b in pair.second.sites() {
                total += self.site.u((a - b).norm_squared());
                if total == f64::INFINITY {
                    return total;
                }
            }
        }
        total
    }
}

/// Serializable description of one of the bundled models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ModelSpec {
    /// [`HardSphere`].
    HardSphere {
        /// Diameter.
        sigma: f64,
    },
    /// [`SquareWell`].
    SquareWell {
        /// Core diameter.
        sigma: f64,
        /// Well range in units of `sigma`.
        lambda: f64,
        /// Well depth.
        epsilon: f64,
    },
    /// [`LennardJones`].
    LennardJones {
        /// Zero-crossing distance.
        sigma: f64,
        /// Well depth.
        epsilon: f64,
    },
    /// [`SoftRamp`].
    SoftRamp {
        /// Range.
        sigma: f64,
        /// Energy at contact.
        epsilon: f64,
    },
}

impl ModelSpec {
    /// Materialises the site potential.
    pub fn build(&self) -> Box<dyn Spherical> {
        match *self {
            ModelSpec::HardSphere { sigma } => Box::new(HardSphere { sigma }),
            ModelSpec::SquareWell {
                sigma,
                lambda,
                epsilon,
            } => Box::new(SquareWell {
                sigma,
                lambda,
                epsilon,
            }),
            ModelSpec::LennardJones { sigma, epsilon } => Box::new(LennardJones { sigma, epsilon }),
            ModelSpec::SoftRamp { sigma, epsilon } => Box::new(SoftRamp { sigma, epsilon }),
        }
    }
}

impl Spherical for Box<dyn Spherical> {
    fn u(&self, r2: f64) -> f64 {
        (**self).u(r2)
    }
}
