//! Non-negative sampling weights built from cluster values.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Reference and target integrand values of one geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterValues {
    /// Signed reference integrand.
    pub reference: f64,
    /// Signed target integrand.
    pub target: f64,
}

/// Which integrand a weight refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Side {
    /// Reference integrand.
    Reference,
    /// Target integrand.
    Target,
}

/// Importance weight used for Metropolis acceptance.
///
/// Signed values feed observables; weights only feed acceptance.
pub trait SamplingWeight: Debug + Send + Sync {
    /// Weight of a geometry with the given cluster values. Must be `>= 0`
    /// for finite input.
    fn weight(&self, values: &ClusterValues) -> f64;
}

/// `|γ|` of one integrand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteValue(pub Side);

impl SamplingWeight for AbsoluteValue {
    fn weight(&self, values: &ClusterValues) -> f64 {
        match self.0 {
            Side::Reference => values.reference.abs(),
            Side::Target => values.target.abs(),
        }
    }
}

/// `w_r |γ_r| + w_t |γ_t|`, used when the target alone samples poorly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Umbrella {
    /// Coefficient of the reference magnitude.
    pub reference_weight: f64,
    /// Coefficient of the target magnitude.
    pub target_weight: f64,
}

impl SamplingWeight for Umbrella {
    fn weight(&self, values: &ClusterValues) -> f64 {
        self.reference_weight * values.reference.abs() + self.target_weight * values.target.abs()
    }
}

/// Serializable choice of sampling weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WeightSpec {
    /// Absolute value of one integrand.
    Absolute {
        /// Integrand whose magnitude is used.
        side: Side,
    },
    /// Linear combination of both magnitudes.
    Umbrella {
        /// Coefficient of the reference magnitude.
        reference_weight: f64,
        /// Coefficient of the target magnitude.
        target_weight: f64,
    },
}

impl WeightSpec {
    /// Materialises the weight.
    pub fn build(&self) -> Box<dyn SamplingWeight> {
        match *self {
            WeightSpec::Absolute { side } => Box::new(AbsoluteValue(side)),
            WeightSpec::Umbrella {
                reference_weight,
                target_weight,
            } => Box::new(Umbrella {
                reference_weight,
                target_weight,
            }),
        }
    }
}

/// Overlap integrand `π_r π_t / (α π_r + π_t)` for reference preference `α`.
///
/// Returns 0 when both weights vanish.
pub fn overlap_value(reference_weight: f64, target_weight: f64, alpha: f64) -> f64 {
    let denominator = alpha * reference_weight + target_weight;
    if denominator == 0.0 {
        0.0
    } else {
        reference_weight * target_weight / denominator
    }
}
