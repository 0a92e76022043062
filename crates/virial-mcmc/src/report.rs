use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use virial_core::{Diagnostic, ErrorInfo, VirialError};

use crate::calibrate::PreferenceSource;
use crate::ensemble::Ensemble;
use crate::overlap::{EstimatorKind, OverlapIntegrator, RatioEstimate};

/// Block correlation above which a stream is flagged.
pub const BLOCK_CORRELATION_LIMIT: f64 = 0.3;

/// Statistics of one sampled observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamReport {
    /// Observable name.
    pub name: String,
    /// Block-mean average.
    pub average: f64,
    /// Raw-sample standard deviation.
    pub standard_deviation: f64,
    /// Standard error of the average.
    pub error: f64,
    /// Lag-1 block correlation.
    pub block_correlation: f64,
}

/// Per-ensemble part of an [`OverlapReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleReport {
    /// Ensemble label.
    pub ensemble: Ensemble,
    /// Samples collected in production.
    pub samples: u64,
    /// Completed blocks.
    pub blocks: usize,
    /// Own-value stream (`γ_k/π_k`), the overlap stream, then one stream
    /// per extra target.
    pub streams: Vec<StreamReport>,
    /// Block covariance of the own-value and overlap streams.
    pub overlap_covariance: f64,
    /// Correlation between the own-value and overlap block means.
    pub overlap_correlation: f64,
    /// Single-ensemble ratio `⟨γ_t/π_k⟩_k / ⟨γ_r/π_k⟩_k`.
    pub ratio: f64,
    /// Error of `ratio`.
    pub ratio_error: f64,
    /// `ratio` times the reference integral, when one was supplied.
    pub full_value: Option<f64>,
    /// Single-ensemble ratios of the extra targets.
    pub extra_ratios: Vec<RatioEstimate>,
    /// Acceptance rate per move kind.
    pub acceptance: BTreeMap<String, f64>,
}

/// Ratio of one extra target cluster to the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraTargetReport {
    /// Registration index.
    pub index: usize,
    /// Estimator behind `ratio`.
    pub estimator: EstimatorKind,
    /// `Γ_xi / Γ_r`.
    pub ratio: f64,
    /// Delta-method error of `ratio`.
    pub ratio_error: f64,
    /// `ratio` times the reference integral.
    pub full_value: Option<f64>,
    /// Error of `full_value`.
    pub full_value_error: Option<f64>,
}

impl ExtraTargetReport {
    /// Report for extra target `index` from `estimate`.
    pub fn new(index: usize, estimate: &RatioEstimate, reference_integral: Option<f64>) -> Self {
        Self {
            index,
            estimator: estimate.kind,
            ratio: estimate.ratio,
            ratio_error: estimate.error,
            full_value: reference_integral.map(|integral| estimate.ratio * integral),
            full_value_error: reference_integral.map(|integral| estimate.error * integral.abs()),
        }
    }
}

/// Final output of an overlap-sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    /// Optional run label.
    pub label: Option<String>,
    /// Cluster points.
    pub points: usize,
    /// Temperature.
    pub temperature: f64,
    /// Estimator behind `ratio`.
    pub estimator: EstimatorKind,
    /// `Γ_t / Γ_r`.
    pub ratio: f64,
    /// Error of `ratio`.
    pub ratio_error: f64,
    /// `ratio` times the reference integral.
    pub full_value: Option<f64>,
    /// Error of `full_value`.
    pub full_value_error: Option<f64>,
    /// Production reference preference.
    pub reference_preference: f64,
    /// Origin of the preference.
    pub preference_source: PreferenceSource,
    /// Reference share at the end of production.
    pub reference_fraction: f64,
    /// Reference-ensemble statistics.
    pub reference: EnsembleReport,
    /// Target-ensemble statistics.
    pub target: EnsembleReport,
    /// Ratios of the extra target clusters.
    #[serde(default)]
    pub extra_targets: Vec<ExtraTargetReport>,
    /// Statistical quality warnings.
    pub diagnostics: Vec<Diagnostic>,
}

impl OverlapReport {
    /// Pretty-printed JSON. Undefined statistics (NaN) become `null`.
    pub fn to_json(&self) -> Result<String, VirialError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| VirialError::Serde(ErrorInfo::new("report-serialize", err.to_string())))
    }
}

fn stream(name: &str, overlap: &OverlapIntegrator, ensemble: Ensemble, column: usize) -> StreamReport {
    let accumulator = overlap.accumulator(ensemble);
    StreamReport {
        name: name.to_string(),
        average: accumulator.average(column),
        standard_deviation: accumulator.standard_deviation(column),
        error: accumulator.error(column),
        block_correlation: accumulator.block_correlation(column),
    }
}

fn streams(
    overlap: &OverlapIntegrator,
    ensemble: Ensemble,
    own_name: &str,
    own: usize,
    column: usize,
) -> Vec<StreamReport> {
    let mut streams = vec![
        stream(own_name, overlap, ensemble, own),
        stream("overlap/weight", overlap, ensemble, column),
    ];
    for index in 0..overlap.extra_target_count() {
        let name = format!("extra{index}/weight");
        streams.push(stream(&name, overlap, ensemble, overlap.extra_column(index)));
    }
    streams
}

/// Summarises one ensemble of `overlap`.
pub fn ensemble_report(
    overlap: &OverlapIntegrator,
    ensemble: Ensemble,
    reference_integral: Option<f64>,
) -> EnsembleReport {
    let own = ensemble.index();
    let column = overlap.overlap_column();
    let accumulator = overlap.accumulator(ensemble);
    let single = overlap.single(ensemble);
    let own_name = match ensemble {
        Ensemble::Reference => "reference/weight",
        Ensemble::Target => "target/weight",
    };
    EnsembleReport {
        ensemble,
        samples: accumulator.sample_count(),
        blocks: accumulator.block_count(),
        streams: streams(overlap, ensemble, own_name, own, column),
        overlap_covariance: accumulator.block_covariance(own, column),
        overlap_correlation: accumulator.correlation(own, column),
        ratio: single.ratio,
        ratio_error: single.error,
        full_value: reference_integral.map(|integral| single.ratio * integral),
        extra_ratios: (0..overlap.extra_target_count())
            .filter_map(|index| overlap.single_extra(ensemble, index).ok())
            .collect(),
        acceptance: overlap.integrator(ensemble).acceptance(),
    }
}

/// Statistical warnings for a finished production run.
pub fn diagnostics(overlap: &OverlapIntegrator, reports: &[&EnsembleReport]) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    for report in reports {
        let label = report.ensemble.as_str();
        if report.blocks == 0 {
            found.push(Diagnostic::nonconvergence(
                ErrorInfo::new("no-samples", "ensemble produced no completed blocks")
                    .with_context("ensemble", label),
            ));
        }
        for stream in &report.streams {
            if stream.block_correlation > BLOCK_CORRELATION_LIMIT {
                found.push(Diagnostic::nonconvergence(
                    ErrorInfo::new("block-correlation", "block means are correlated; error may be optimistic")
                        .with_context("ensemble", label)
                        .with_context("stream", stream.name.clone())
                        .with_context("correlation", format!("{:.3}", stream.block_correlation))
                        .with_hint("increase block_size"),
                ));
            }
        }
        for kind in overlap.integrator(report.ensemble).unconverged_moves() {
            found.push(Diagnostic::nonconvergence(
                ErrorInfo::new("step-tuning", "step size tuning did not reach the target acceptance")
                    .with_context("ensemble", label)
                    .with_context("move", kind.as_str()),
            ));
        }
    }
    for diagnostic in &found {
        log::warn!("{diagnostic}");
    }
    found
}
