use serde::{Deserialize, Serialize};

/// Step-size controller for one move type.
///
/// While tuning, every `adjust_interval` trials the step grows by
/// `1 + factor` when acceptance exceeds the target and shrinks by the same
/// factor otherwise. The factor halves each time the direction flips, down
/// to a floor, which damps oscillation from noisy acceptance estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTracker {
    step: f64,
    min_step: f64,
    max_step: f64,
    target: f64,
    adjust_interval: usize,
    factor: f64,
    last_direction: i8,
    interval_trials: usize,
    interval_accepted: usize,
    total_trials: u64,
    total_accepted: u64,
    tuning: bool,
    adjustable: bool,
    pinned_intervals: usize,
}

const INITIAL_FACTOR: f64 = 0.05;
const MIN_FACTOR: f64 = 0.005;
const PINNED_LIMIT: usize = 3;

impl StepTracker {
    /// Tracker for an adjustable step confined to `[min_step, max_step]`.
    ///
    /// An inverted range collapses to `min_step`.
    pub fn new(step: f64, min_step: f64, max_step: f64, target: f64, adjust_interval: usize) -> Self {
        let max_step = max_step.max(min_step);
        Self {
            step: step.max(min_step).min(max_step),
            min_step,
            max_step,
            target,
            adjust_interval: adjust_interval.max(1),
            factor: INITIAL_FACTOR,
            last_direction: 0,
            interval_trials: 0,
            interval_accepted: 0,
            total_trials: 0,
            total_accepted: 0,
            tuning: true,
            adjustable: true,
            pinned_intervals: 0,
        }
    }

    /// Tracker for a move without a step size; only counts acceptance.
    pub fn fixed() -> Self {
        let mut tracker = Self::new(0.0, 0.0, 0.0, 0.5, 1);
        tracker.adjustable = false;
        tracker
    }

    /// Current step size.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Enables or disables tuning. Production runs with tuning off.
    pub fn set_tuning(&mut self, tuning: bool) {
        self.tuning = tuning;
        self.interval_trials = 0;
        self.interval_accepted = 0;
    }

    /// Whether the step is being tuned.
    pub fn is_tuning(&self) -> bool {
        self.tuning
    }

    /// Records one trial outcome and adjusts the step when an interval closes.
    pub fn record(&mut self, accepted: bool) {
        self.total_trials += 1;
        self.interval_trials += 1;
        if accepted {
            self.total_accepted += 1;
            self.interval_accepted += 1;
        }
        if self.tuning && self.adjustable && self.interval_trials >= self.adjust_interval {
            self.adjust();
        }
    }

    fn adjust(&mut self) {
        let rate = self.interval_accepted as f64 / self.interval_trials as f64;
        let direction: i8 = if rate > self.target { 1 } else { -1 };
        if self.last_direction != 0 && direction != self.last_direction {
            self.factor = (self.factor * 0.5).max(MIN_FACTOR);
        }
        self.last_direction = direction;
        let scaled = if direction > 0 {
            self.step * (1.0 + self.factor)
        } else {
            self.step / (1.0 + self.factor)
        };
        self.step = scaled.max(self.min_step).min(self.max_step);
        let on_bound = self.step <= self.min_step || self.step >= self.max_step;
        if on_bound && (rate - self.target).abs() > 0.2 {
            self.pinned_intervals += 1;
        } else {
            self.pinned_intervals = 0;
        }
        log::debug!("step adjusted to {:.5} (acceptance {:.3})", self.step, rate);
        self.interval_trials = 0;
        self.interval_accepted = 0;
    }

    /// Acceptance rate over all recorded trials (NaN before the first).
    pub fn acceptance(&self) -> f64 {
        if self.total_trials == 0 {
            f64::NAN
        } else {
            self.total_accepted as f64 / self.total_trials as f64
        }
    }

    /// Total trials recorded.
    pub fn trials(&self) -> u64 {
        self.total_trials
    }

    /// Clears acceptance counters, keeping the step.
    pub fn reset_counts(&mut self) {
        self.total_trials = 0;
        self.total_accepted = 0;
        self.interval_trials = 0;
        self.interval_accepted = 0;
    }

    /// False once the step has sat on a clamp, far from the target
    /// acceptance, for several consecutive intervals.
    pub fn converged(&self) -> bool {
        !self.adjustable || self.pinned_intervals < PINNED_LIMIT
    }
}
