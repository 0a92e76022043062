use serde::{Deserialize, Serialize};
use virial_cluster::overlap_value;
use virial_core::{ErrorInfo, VirialError};

use crate::ensemble::{Ensemble, EnsembleIntegrator, Measurement};
use crate::stats::BlockAccumulator;

/// Reference preferences tracked by the overlap streams, in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaGrid {
    values: Vec<f64>,
}

impl AlphaGrid {
    /// Grid holding only `alpha`.
    pub fn single(alpha: f64) -> Self {
        Self {
            values: vec![alpha],
        }
    }

    /// `count` values spaced evenly in `ln α` over `ln centre ± span`.
    pub fn spanning(centre: f64, count: usize, span: f64) -> Self {
        if count <= 1 {
            return Self::single(centre);
        }
        let ln_centre = centre.ln();
        let values = (0..count)
            .map(|j| {
                let t = 2.0 * j as f64 / (count - 1) as f64 - 1.0;
                (ln_centre + span * t).exp()
            })
            .collect();
        Self { values }
    }

    /// Values in ascending order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; grids hold at least one value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the value closest to `alpha` in log space.
    pub fn nearest(&self, alpha: f64) -> usize {
        if !(alpha.is_finite() && alpha > 0.0) {
            return self.values.len() / 2;
        }
        let target = alpha.ln();
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (j, value) in self.values.iter().enumerate() {
            let distance = (value.ln() - target).abs();
            if distance < best_distance {
                best = j;
                best_distance = distance;
            }
        }
        best
    }
}

/// Result of locating the preference that balances the two ensembles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlapAverage {
    /// Balancing preference (NaN while either ensemble lacks blocks).
    pub value: f64,
    /// True when the balance point lies outside the grid and `value` is
    /// the nearest edge.
    pub at_edge: bool,
}

/// Which ensembles contributed to a ratio estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    /// Both ensembles, joined through the overlap streams.
    Overlap,
    /// Reference samples only.
    ReferenceOnly,
    /// Target samples only.
    TargetOnly,
}

/// Ratio of target to reference integrals with its propagated error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioEstimate {
    /// Estimator used.
    pub kind: EstimatorKind,
    /// `Γ_t / Γ_r`.
    pub ratio: f64,
    /// Absolute standard error of `ratio`.
    pub error: f64,
}

const OWN_REFERENCE: usize = 0;
const OWN_TARGET: usize = 1;
const FIRST_EXTRA: usize = 2;

/// Drives the reference and target chains in batches and estimates the
/// ratio of their integrals.
///
/// Every sample from ensemble `k` is stored as
/// `[γ_r/π_k, γ_t/π_k, γ_x1/π_k, ..., γ_OS(α_1)/π_k, ...]` in that
/// ensemble's accumulator, where `γ_xi` are the extra target clusters.
#[derive(Debug)]
pub struct OverlapIntegrator {
    integrators: [EnsembleIntegrator; 2],
    accumulators: [BlockAccumulator; 2],
    alphas: AlphaGrid,
    extra_targets: usize,
    sub_steps: usize,
    reference_fraction: f64,
    min_reference_fraction: f64,
    adjust: bool,
    batches: u64,
}

impl OverlapIntegrator {
    /// Couples the two chains.
    pub fn new(
        reference: EnsembleIntegrator,
        target: EnsembleIntegrator,
        sub_steps: usize,
        block_size: usize,
    ) -> Result<Self, VirialError> {
        if reference.ensemble() != Ensemble::Reference || target.ensemble() != Ensemble::Target {
            return Err(VirialError::config(
                "ensemble-order",
                "integrators must be given as (reference, target)",
            ));
        }
        if sub_steps == 0 {
            return Err(VirialError::config("sub-steps", "sub_steps must be nonzero"));
        }
        let extra_targets = reference.extra_target_count();
        if target.extra_target_count() != extra_targets {
            return Err(VirialError::Config(
                ErrorInfo::new("extra-targets", "both chains must observe the same extra targets")
                    .with_context("reference", extra_targets.to_string())
                    .with_context("target", target.extra_target_count().to_string()),
            ));
        }
        let alphas = AlphaGrid::single(1.0);
        let dimension = FIRST_EXTRA + extra_targets + alphas.len();
        Ok(Self {
            integrators: [reference, target],
            accumulators: [
                BlockAccumulator::new(dimension, block_size)?,
                BlockAccumulator::new(dimension, block_size)?,
            ],
            alphas,
            extra_targets,
            sub_steps,
            reference_fraction: 0.5,
            min_reference_fraction: 0.0,
            adjust: false,
            batches: 0,
        })
    }

    /// Chain of `ensemble`.
    pub fn integrator(&self, ensemble: Ensemble) -> &EnsembleIntegrator {
        &self.integrators[ensemble.index()]
    }

    /// Statistics of `ensemble`.
    pub fn accumulator(&self, ensemble: Ensemble) -> &BlockAccumulator {
        &self.accumulators[ensemble.index()]
    }

    /// Current preference grid.
    pub fn alphas(&self) -> &AlphaGrid {
        &self.alphas
    }

    /// Replaces the preference grid and clears the statistics.
    pub fn set_alphas(&mut self, alphas: AlphaGrid) -> Result<(), VirialError> {
        self.alphas = alphas;
        self.rebuild_accumulators(self.accumulators[0].block_size())
    }

    /// Changes the block size and clears the statistics.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), VirialError> {
        self.rebuild_accumulators(block_size)
    }

    /// Number of extra target clusters observed by both chains.
    pub fn extra_target_count(&self) -> usize {
        self.extra_targets
    }

    /// Accumulator column of extra target `index`.
    pub fn extra_column(&self, index: usize) -> usize {
        FIRST_EXTRA + index
    }

    fn first_overlap(&self) -> usize {
        FIRST_EXTRA + self.extra_targets
    }

    fn rebuild_accumulators(&mut self, block_size: usize) -> Result<(), VirialError> {
        let dimension = self.first_overlap() + self.alphas.len();
        self.accumulators = [
            BlockAccumulator::new(dimension, block_size)?,
            BlockAccumulator::new(dimension, block_size)?,
        ];
        Ok(())
    }

    /// Clears both accumulators and the step counters used for scheduling.
    pub fn reset_statistics(&mut self) {
        for accumulator in &mut self.accumulators {
            accumulator.reset();
        }
        self.batches = 0;
    }

    /// Share of elementary steps given to the reference chain. `1` or `0`
    /// drives a single chain.
    pub fn reference_fraction(&self) -> f64 {
        self.reference_fraction
    }

    /// Sets the reference share, clamped to `[0, 1]`.
    pub fn set_reference_fraction(&mut self, fraction: f64) {
        self.reference_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Enables re-deriving the reference share after each batch, clamped
    /// to `[min, 1 - min]`.
    pub fn set_adjust(&mut self, adjust: bool, min_fraction: f64) {
        self.adjust = adjust;
        self.min_reference_fraction = min_fraction;
    }

    /// Turns step-size tuning on or off in both chains.
    pub fn set_tuning(&mut self, tuning: bool) {
        for integrator in &mut self.integrators {
            integrator.set_tuning(tuning);
        }
    }

    /// Clears the move acceptance counters of both chains.
    pub fn reset_acceptance(&mut self) {
        for integrator in &mut self.integrators {
            integrator.reset_acceptance();
        }
    }

    /// Batches run since the last reset.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    fn next_ensemble(&self) -> Ensemble {
        let p = self.reference_fraction;
        if p >= 1.0 {
            return Ensemble::Reference;
        }
        if p <= 0.0 {
            return Ensemble::Target;
        }
        let reference = self.accumulators[0].sample_count() as f64;
        let total = reference + self.accumulators[1].sample_count() as f64;
        if reference <= p * total {
            Ensemble::Reference
        } else {
            Ensemble::Target
        }
    }

    fn sample(&self, ensemble: Ensemble, measurement: &Measurement) -> Vec<f64> {
        let own = measurement.weight(ensemble);
        let mut sample = Vec::with_capacity(self.first_overlap() + self.alphas.len());
        sample.push(measurement.values.reference / own);
        sample.push(measurement.values.target / own);
        sample.extend(measurement.extra.iter().map(|value| value / own));
        for &alpha in self.alphas.values() {
            let overlap = overlap_value(
                measurement.reference_weight,
                measurement.target_weight,
                alpha,
            );
            sample.push(overlap / own);
        }
        sample
    }

    /// Drives the lagging chain for one batch and, when enabled, updates
    /// the reference share.
    pub fn do_batch(&mut self) -> Result<Ensemble, VirialError> {
        let ensemble = self.next_ensemble();
        let k = ensemble.index();
        for _ in 0..self.sub_steps {
            let record = self.integrators[k].step()?;
            let sample = self.sample(ensemble, &record.measurement);
            self.accumulators[k].push(&sample)?;
        }
        self.batches += 1;
        if self.adjust
            && self.accumulators[0].block_count() >= 2
            && self.accumulators[1].block_count() >= 2
        {
            let min = self.min_reference_fraction;
            let ideal = self.ideal_reference_fraction();
            let adjusted = ideal.clamp(min, 1.0 - min);
            if adjusted != self.reference_fraction {
                log::debug!(
                    "reference fraction {:.4} -> {:.4}",
                    self.reference_fraction,
                    adjusted
                );
            }
            self.reference_fraction = adjusted;
        }
        Ok(ensemble)
    }

    /// Runs `batches` batches.
    pub fn run(&mut self, batches: usize) -> Result<(), VirialError> {
        for _ in 0..batches {
            self.do_batch()?;
        }
        Ok(())
    }

    /// Preference that balances the overlap averages of the two chains.
    ///
    /// Finds the zero of `ln(⟨γ_OS/π_r⟩_r / ⟨γ_OS/π_t⟩_t) - ln α` across the
    /// grid by linear interpolation in `ln α`.
    pub fn overlap_average(&self) -> OverlapAverage {
        let alphas = self.alphas.values();
        let [reference, target] = &self.accumulators;
        let first = self.first_overlap();
        if alphas.len() == 1 {
            return OverlapAverage {
                value: reference.average(first) / target.average(first),
                at_edge: false,
            };
        }
        let residual = |j: usize| {
            let r = reference.average(first + j) / target.average(first + j);
            r.ln() - alphas[j].ln()
        };
        let last = alphas.len() - 1;
        let first_residual = residual(0);
        let last_residual = residual(last);
        if first_residual.is_nan() || last_residual.is_nan() {
            return OverlapAverage {
                value: f64::NAN,
                at_edge: false,
            };
        }
        if first_residual < 0.0 {
            return OverlapAverage {
                value: alphas[0],
                at_edge: true,
            };
        }
        if last_residual > 0.0 {
            return OverlapAverage {
                value: alphas[last],
                at_edge: true,
            };
        }
        let mut previous = first_residual;
        for j in 1..=last {
            let current = residual(j);
            if current.is_nan() {
                return OverlapAverage {
                    value: f64::NAN,
                    at_edge: false,
                };
            }
            if current <= 0.0 {
                let (lo, hi) = (alphas[j - 1].ln(), alphas[j].ln());
                let ln_alpha = if previous == current {
                    lo
                } else {
                    lo + (hi - lo) * previous / (previous - current)
                };
                return OverlapAverage {
                    value: ln_alpha.exp(),
                    at_edge: false,
                };
            }
            previous = current;
        }
        OverlapAverage {
            value: alphas[last],
            at_edge: true,
        }
    }

    /// Accumulator column of the overlap stream used for estimates: the
    /// grid value nearest the current balance point.
    pub fn overlap_column(&self) -> usize {
        let index = if self.alphas.len() == 1 {
            0
        } else {
            self.alphas.nearest(self.overlap_average().value)
        };
        self.first_overlap() + index
    }

    /// Reference share minimising the combined error, given the current
    /// share `p` and the relative errors `e_r`, `e_t` of the two chains'
    /// half ratios: `1 / (1 + (e_t / e_r) sqrt((1 - p) / p))`.
    ///
    /// Relative errors above 1 (or NaN) count as 1. Returns the current
    /// share when the result is not finite.
    pub fn ideal_reference_fraction(&self) -> f64 {
        let p = self.reference_fraction;
        let column = self.overlap_column();
        let cap = |e: f64| if e.is_nan() || e > 1.0 { 1.0 } else { e };
        let reference_error = cap(self.accumulators[0].ratio_relative_error(OWN_REFERENCE, column));
        let target_error = cap(self.accumulators[1].ratio_relative_error(OWN_TARGET, column));
        let ideal = 1.0 / (1.0 + target_error / reference_error * ((1.0 - p) / p).sqrt());
        if ideal.is_finite() {
            ideal
        } else {
            p
        }
    }

    /// Ratio of target to reference integrals from whichever chains hold
    /// completed blocks.
    pub fn estimate(&self) -> Result<RatioEstimate, VirialError> {
        self.estimate_column(OWN_TARGET)
    }

    /// Ratio of extra target `index` to the reference integral, with the
    /// same estimator choice as [`OverlapIntegrator::estimate`].
    pub fn estimate_extra(&self, index: usize) -> Result<RatioEstimate, VirialError> {
        self.check_extra(index)?;
        self.estimate_column(self.extra_column(index))
    }

    fn check_extra(&self, index: usize) -> Result<(), VirialError> {
        if index < self.extra_targets {
            Ok(())
        } else {
            Err(VirialError::Config(
                ErrorInfo::new("extra-target-index", "no extra target cluster at this index")
                    .with_context("index", index.to_string())
                    .with_context("count", self.extra_targets.to_string()),
            ))
        }
    }

    fn estimate_column(&self, numerator: usize) -> Result<RatioEstimate, VirialError> {
        let [reference, target] = &self.accumulators;
        match (reference.block_count() > 0, target.block_count() > 0) {
            (true, true) => {
                let column = self.overlap_column();
                let target_half = target.ratio(numerator, column);
                let reference_half = reference.ratio(OWN_REFERENCE, column);
                let ratio = target_half / reference_half;
                let relative = target
                    .ratio_relative_error(numerator, column)
                    .hypot(reference.ratio_relative_error(OWN_REFERENCE, column));
                Ok(RatioEstimate {
                    kind: EstimatorKind::Overlap,
                    ratio,
                    error: ratio.abs() * relative,
                })
            }
            (true, false) => Ok(self.single_column(Ensemble::Reference, numerator)),
            (false, true) => Ok(self.single_column(Ensemble::Target, numerator)),
            (false, false) => Err(VirialError::Config(
                ErrorInfo::new("no-samples", "neither ensemble completed a block")
                    .with_context("batches", self.batches.to_string())
                    .with_hint("increase steps or lower block_size"),
            )),
        }
    }

    /// Single-chain estimate `⟨γ_t/π_k⟩_k / ⟨γ_r/π_k⟩_k` from `ensemble`.
    pub fn single(&self, ensemble: Ensemble) -> RatioEstimate {
        self.single_column(ensemble, OWN_TARGET)
    }

    /// Single-chain estimate `⟨γ_xi/π_k⟩_k / ⟨γ_r/π_k⟩_k` for extra target
    /// `index`.
    pub fn single_extra(&self, ensemble: Ensemble, index: usize) -> Result<RatioEstimate, VirialError> {
        self.check_extra(index)?;
        Ok(self.single_column(ensemble, self.extra_column(index)))
    }

    fn single_column(&self, ensemble: Ensemble, numerator: usize) -> RatioEstimate {
        let accumulator = &self.accumulators[ensemble.index()];
        RatioEstimate {
            kind: match ensemble {
                Ensemble::Reference => EstimatorKind::ReferenceOnly,
                Ensemble::Target => EstimatorKind::TargetOnly,
            },
            ratio: accumulator.ratio(numerator, OWN_REFERENCE),
            error: accumulator.ratio_error(numerator, OWN_REFERENCE),
        }
    }
}
