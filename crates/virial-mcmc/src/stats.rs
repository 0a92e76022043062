use serde::{Deserialize, Serialize};
use virial_core::{ErrorInfo, VirialError};

/// Blocked running statistics over fixed-dimension samples.
///
/// Samples are summed into blocks of `block_size`; completed block means
/// feed the second-level sums behind averages, errors, covariances and the
/// lag-1 block correlation. Averages use completed blocks only.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAccumulator {
    dimension: usize,
    block_size: usize,
    samples: u64,
    raw_sum: Vec<f64>,
    raw_sum_sq: Vec<f64>,
    block_fill: usize,
    block_sum: Vec<f64>,
    blocks: usize,
    mean_sum: Vec<f64>,
    cross_sum: Vec<f64>,
    lag_sum: Vec<f64>,
    first_mean: Vec<f64>,
    last_mean: Vec<f64>,
}

impl BlockAccumulator {
    /// Accumulator for `dimension`-component samples.
    pub fn new(dimension: usize, block_size: usize) -> Result<Self, VirialError> {
        if dimension == 0 || block_size == 0 {
            return Err(VirialError::Config(
                ErrorInfo::new("accumulator-shape", "dimension and block size must be nonzero")
                    .with_context("dimension", dimension.to_string())
                    .with_context("block_size", block_size.to_string()),
            ));
        }
        Ok(Self {
            dimension,
            block_size,
            samples: 0,
            raw_sum: vec![0.0; dimension],
            raw_sum_sq: vec![0.0; dimension],
            block_fill: 0,
            block_sum: vec![0.0; dimension],
            blocks: 0,
            mean_sum: vec![0.0; dimension],
            cross_sum: vec![0.0; dimension * dimension],
            lag_sum: vec![0.0; dimension],
            first_mean: vec![0.0; dimension],
            last_mean: vec![0.0; dimension],
        })
    }

    /// Components per sample.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Samples per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Adds one sample.
    pub fn push(&mut self, sample: &[f64]) -> Result<(), VirialError> {
        if sample.len() != self.dimension {
            return Err(VirialError::Config(
                ErrorInfo::new("sample-dimension", "sample has the wrong number of components")
                    .with_context("expected", self.dimension.to_string())
                    .with_context("actual", sample.len().to_string()),
            ));
        }
        self.samples += 1;
        for (i, &x) in sample.iter().enumerate() {
            self.raw_sum[i] += x;
            self.raw_sum_sq[i] += x * x;
            self.block_sum[i] += x;
        }
        self.block_fill += 1;
        if self.block_fill == self.block_size {
            self.close_block();
        }
        Ok(())
    }

    fn close_block(&mut self) {
        let d = self.dimension;
        let means: Vec<f64> = self
            .block_sum
            .iter()
            .map(|s| s / self.block_size as f64)
            .collect();
        for i in 0..d {
            self.mean_sum[i] += means[i];
            for j in 0..d {
                self.cross_sum[i * d + j] += means[i] * means[j];
            }
            if self.blocks == 0 {
                self.first_mean[i] = means[i];
            } else {
                self.lag_sum[i] += means[i] * self.last_mean[i];
            }
        }
        self.last_mean = means;
        self.blocks += 1;
        self.block_fill = 0;
        self.block_sum.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Drops every sample.
    pub fn reset(&mut self) {
        *self = Self {
            dimension: self.dimension,
            block_size: self.block_size,
            samples: 0,
            raw_sum: vec![0.0; self.dimension],
            raw_sum_sq: vec![0.0; self.dimension],
            block_fill: 0,
            block_sum: vec![0.0; self.dimension],
            blocks: 0,
            mean_sum: vec![0.0; self.dimension],
            cross_sum: vec![0.0; self.dimension * self.dimension],
            lag_sum: vec![0.0; self.dimension],
            first_mean: vec![0.0; self.dimension],
            last_mean: vec![0.0; self.dimension],
        };
    }

    /// Samples pushed, including the open block.
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Completed blocks.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Mean of component `i` over completed blocks (NaN with none).
    pub fn average(&self, i: usize) -> f64 {
        if self.blocks == 0 {
            f64::NAN
        } else {
            self.mean_sum[i] / self.blocks as f64
        }
    }

    /// Standard deviation of the raw samples of component `i`.
    pub fn standard_deviation(&self, i: usize) -> f64 {
        if self.samples == 0 {
            return f64::NAN;
        }
        let n = self.samples as f64;
        let mean = self.raw_sum[i] / n;
        (self.raw_sum_sq[i] / n - mean * mean).max(0.0).sqrt()
    }

    /// Covariance of the block means of components `i` and `j`.
    pub fn block_covariance(&self, i: usize, j: usize) -> f64 {
        if self.blocks == 0 {
            return f64::NAN;
        }
        let cov = self.cross_sum[i * self.dimension + j] / self.blocks as f64
            - self.average(i) * self.average(j);
        if i == j {
            cov.max(0.0)
        } else {
            cov
        }
    }

    /// Standard error of the mean of component `i`, from the block spread.
    pub fn error(&self, i: usize) -> f64 {
        if self.blocks < 2 {
            return f64::NAN;
        }
        (self.block_covariance(i, i) / (self.blocks - 1) as f64).sqrt()
    }

    /// Lag-1 autocorrelation of the block means of component `i`.
    ///
    /// NaN with fewer than three blocks or when the block means do not vary.
    pub fn block_correlation(&self, i: usize) -> f64 {
        if self.blocks < 3 {
            return f64::NAN;
        }
        let avg = self.average(i);
        let variance = self.block_covariance(i, i);
        if !(variance > f64::EPSILON * avg * avg) {
            return f64::NAN;
        }
        let edges = 2.0 * self.mean_sum[i] - self.first_mean[i] - self.last_mean[i];
        let lagged = (self.lag_sum[i] - edges * avg) / (self.blocks - 1) as f64 + avg * avg;
        lagged / variance
    }

    /// Correlation coefficient of the block means of `i` and `j`.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denominator = (self.block_covariance(i, i) * self.block_covariance(j, j)).sqrt();
        if !(denominator > 0.0) {
            return f64::NAN;
        }
        self.block_covariance(i, j) / denominator
    }

    /// `average(i) / average(j)`.
    pub fn ratio(&self, i: usize, j: usize) -> f64 {
        self.average(i) / self.average(j)
    }

    /// Relative error of [`BlockAccumulator::ratio`] by the delta method,
    /// including the covariance of the two means.
    pub fn ratio_relative_error(&self, i: usize, j: usize) -> f64 {
        if self.blocks < 2 {
            return f64::NAN;
        }
        let a = self.average(i);
        let b = self.average(j);
        let ra = self.error(i) / a;
        let rb = self.error(j) / b;
        let cov = self.block_covariance(i, j) / (self.blocks - 1) as f64;
        (ra * ra + rb * rb - 2.0 * cov / (a * b)).max(0.0).sqrt()
    }

    /// Absolute error of [`BlockAccumulator::ratio`].
    pub fn ratio_error(&self, i: usize, j: usize) -> f64 {
        self.ratio(i, j).abs() * self.ratio_relative_error(i, j)
    }

    /// Serializable per-component summary.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let components = 0..self.dimension;
        StatisticsSnapshot {
            samples: self.samples,
            blocks: self.blocks,
            averages: components.clone().map(|i| self.average(i)).collect(),
            standard_deviations: components.clone().map(|i| self.standard_deviation(i)).collect(),
            errors: components.clone().map(|i| self.error(i)).collect(),
            block_correlations: components.map(|i| self.block_correlation(i)).collect(),
        }
    }
}

/// Point-in-time summary of a [`BlockAccumulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Samples pushed.
    pub samples: u64,
    /// Completed blocks.
    pub blocks: usize,
    /// Block-mean averages.
    pub averages: Vec<f64>,
    /// Raw-sample standard deviations.
    pub standard_deviations: Vec<f64>,
    /// Standard errors of the averages.
    pub errors: Vec<f64>,
    /// Lag-1 block correlations.
    pub block_correlations: Vec<f64>,
}
