use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use virial_cluster::{ClusterIntegrand, ClusterValues, SamplingWeight};
use virial_core::{ClusterBox, ErrorInfo, RngHandle, VirialError};

use crate::config::SeedingConfig;
use crate::moves::{MoveKind, MoveSet};
use crate::seed::ConfigurationSeed;

/// One of the two coupled Markov chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ensemble {
    /// Samples the reference weight.
    Reference,
    /// Samples the target weight.
    Target,
}

impl Ensemble {
    /// Both ensembles in index order.
    pub const ALL: [Ensemble; 2] = [Ensemble::Reference, Ensemble::Target];

    /// Position in per-ensemble arrays.
    pub fn index(&self) -> usize {
        match self {
            Ensemble::Reference => 0,
            Ensemble::Target => 1,
        }
    }

    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ensemble::Reference => "reference",
            Ensemble::Target => "target",
        }
    }
}

/// Phase of the per-ensemble step state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPhase {
    /// Between steps.
    Idle,
    /// A move is perturbing the trial geometry.
    Proposing,
    /// Cluster values and weights of the candidate are being computed.
    Evaluating,
    /// The candidate was committed.
    Accepted,
    /// The candidate was reverted.
    Rejected,
}

/// Cluster values and both sampling weights of one geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Signed reference and target integrands.
    pub values: ClusterValues,
    /// Signed integrands of the extra target clusters, in registration
    /// order. They are observed but never enter a weight.
    #[serde(default)]
    pub extra: Vec<f64>,
    /// Reference ensemble weight `π_r`.
    pub reference_weight: f64,
    /// Target ensemble weight `π_t`.
    pub target_weight: f64,
}

impl Measurement {
    /// Weight sampled by `ensemble`.
    pub fn weight(&self, ensemble: Ensemble) -> f64 {
        match ensemble {
            Ensemble::Reference => self.reference_weight,
            Ensemble::Target => self.target_weight,
        }
    }

    fn is_finite(&self) -> bool {
        self.values.reference.is_finite()
            && self.values.target.is_finite()
            && self.reference_weight.is_finite()
            && self.target_weight.is_finite()
            && self.extra.iter().all(|value| value.is_finite())
    }
}

/// Immutable outcome of one elementary step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Ensemble that stepped.
    pub ensemble: Ensemble,
    /// Move attempted, `None` when the selected move had nothing to act on.
    pub move_kind: Option<MoveKind>,
    /// Whether the candidate was kept.
    pub accepted: bool,
    /// Measurement of the geometry after the step.
    pub measurement: Measurement,
}

/// Metropolis chain over one box, driven by one sampling weight.
#[derive(Debug)]
pub struct EnsembleIntegrator {
    ensemble: Ensemble,
    cluster_box: ClusterBox,
    reference: Box<dyn ClusterIntegrand>,
    target: Box<dyn ClusterIntegrand>,
    extra_targets: Vec<Box<dyn ClusterIntegrand>>,
    reference_weight: Box<dyn SamplingWeight>,
    target_weight: Box<dyn SamplingWeight>,
    moves: MoveSet,
    rng: RngHandle,
    current: Measurement,
    phase: StepPhase,
    steps: u64,
}

impl EnsembleIntegrator {
    /// Builds an integrator and measures the starting geometry. Call
    /// [`EnsembleIntegrator::seed`] before stepping unless the box already
    /// holds a valid geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ensemble: Ensemble,
        cluster_box: ClusterBox,
        reference: Box<dyn ClusterIntegrand>,
        target: Box<dyn ClusterIntegrand>,
        reference_weight: Box<dyn SamplingWeight>,
        target_weight: Box<dyn SamplingWeight>,
        moves: MoveSet,
        rng: RngHandle,
    ) -> Result<Self, VirialError> {
        if moves.is_empty() {
            return Err(VirialError::config("moves", "move set is empty"));
        }
        let mut integrator = Self {
            ensemble,
            cluster_box,
            reference,
            target,
            extra_targets: Vec::new(),
            reference_weight,
            target_weight,
            moves,
            rng,
            current: Measurement {
                values: ClusterValues {
                    reference: 0.0,
                    target: 0.0,
                },
                extra: Vec::new(),
                reference_weight: 0.0,
                target_weight: 0.0,
            },
            phase: StepPhase::Idle,
            steps: 0,
        };
        integrator.current = integrator.measure();
        Ok(integrator)
    }

    /// Adds clusters observed alongside the target without entering any
    /// weight, and re-measures the current geometry.
    pub fn with_extra_targets(mut self, extra_targets: Vec<Box<dyn ClusterIntegrand>>) -> Self {
        self.extra_targets = extra_targets;
        self.current = self.measure();
        self
    }

    /// Number of extra target clusters.
    pub fn extra_target_count(&self) -> usize {
        self.extra_targets.len()
    }

    fn measure(&mut self) -> Measurement {
        let geometry = self.cluster_box.geometry();
        let values = ClusterValues {
            reference: self.reference.value(&geometry),
            target: self.target.value(&geometry),
        };
        let extra = self
            .extra_targets
            .iter_mut()
            .map(|cluster| cluster.value(&geometry))
            .collect();
        Measurement {
            values,
            extra,
            reference_weight: self.reference_weight.weight(&values),
            target_weight: self.target_weight.weight(&values),
        }
    }

    /// Places a starting geometry with `seed` and retries with random
    /// perturbations until the ensemble's weight is positive.
    pub fn seed(
        &mut self,
        seed: &dyn ConfigurationSeed,
        config: &SeedingConfig,
        rng: &mut RngHandle,
    ) -> Result<(), VirialError> {
        let mut molecules = seed.place(self.cluster_box.molecules(), rng);
        for attempt in 0..=config.max_retries {
            self.cluster_box.replace(molecules.clone())?;
            let measurement = self.measure();
            if !measurement.is_finite() {
                return Err(VirialError::NumericOverflow(
                    ErrorInfo::new("seed-overflow", "starting geometry evaluated to a non-finite value")
                        .with_context("ensemble", self.ensemble.as_str())
                        .with_context("attempt", attempt.to_string()),
                ));
            }
            if measurement.weight(self.ensemble) > 0.0 {
                log::info!(
                    "{} ensemble seeded after {} perturbation(s)",
                    self.ensemble.as_str(),
                    attempt
                );
                self.current = measurement;
                return Ok(());
            }
            molecules = seed.perturb(&molecules, config.perturbation, rng);
        }
        Err(VirialError::DegenerateConfiguration(
            ErrorInfo::new("seed-exhausted", "no starting geometry with a nonzero weight was found")
                .with_context("ensemble", self.ensemble.as_str())
                .with_context("retries", config.max_retries.to_string())
                .with_hint("increase seeding.max_retries or shrink seeding.radius"),
        ))
    }

    /// Performs one Metropolis step.
    pub fn step(&mut self) -> Result<StepRecord, VirialError> {
        let own_weight = self.current.weight(self.ensemble);
        if !self.current.is_finite() || !(own_weight > 0.0) {
            return Err(VirialError::NumericOverflow(
                ErrorInfo::new("current-weight", "committed geometry has an invalid weight")
                    .with_context("ensemble", self.ensemble.as_str())
                    .with_context("weight", own_weight.to_string())
                    .with_context("step", self.steps.to_string()),
            ));
        }
        self.steps += 1;

        self.phase = StepPhase::Proposing;
        let index = self.moves.select(&mut self.rng);
        self.cluster_box.begin_trial();
        let proposal = self.moves.get_mut(index);
        let kind = proposal.kind();
        if !proposal.propose(&mut self.cluster_box, &mut self.rng) {
            self.cluster_box.revert();
            self.phase = StepPhase::Idle;
            return Ok(self.record(None, false));
        }

        self.phase = StepPhase::Evaluating;
        let candidate = self.measure();
        let candidate_weight = candidate.weight(self.ensemble);
        let accepted = if !candidate.is_finite() || !(candidate_weight > 0.0) {
            false
        } else {
            let ratio = candidate_weight / own_weight;
            ratio >= 1.0 || self.rng.uniform() < ratio
        };

        if accepted {
            self.phase = StepPhase::Accepted;
            self.cluster_box.commit();
            self.current = candidate;
        } else {
            self.phase = StepPhase::Rejected;
            self.cluster_box.revert();
        }
        self.moves.get_mut(index).tracker_mut().record(accepted);
        self.phase = StepPhase::Idle;
        Ok(self.record(Some(kind), accepted))
    }

    fn record(&self, move_kind: Option<MoveKind>, accepted: bool) -> StepRecord {
        StepRecord {
            ensemble: self.ensemble,
            move_kind,
            accepted,
            measurement: self.current.clone(),
        }
    }

    /// Which ensemble this is.
    pub fn ensemble(&self) -> Ensemble {
        self.ensemble
    }

    /// Current phase; `Idle` between calls to [`EnsembleIntegrator::step`].
    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    /// Measurement of the committed geometry.
    pub fn current(&self) -> &Measurement {
        &self.current
    }

    /// Committed geometry.
    pub fn cluster_box(&self) -> &ClusterBox {
        &self.cluster_box
    }

    /// Elementary steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Registered moves.
    pub fn moves(&self) -> &MoveSet {
        &self.moves
    }

    /// Turns step-size tuning on or off.
    pub fn set_tuning(&mut self, tuning: bool) {
        self.moves.set_tuning(tuning);
    }

    /// Clears the acceptance counters of every move.
    pub fn reset_acceptance(&mut self) {
        for index in 0..self.moves.len() {
            self.moves.get_mut(index).tracker_mut().reset_counts();
        }
    }

    /// Acceptance rate per move kind over the recorded trials.
    pub fn acceptance(&self) -> BTreeMap<String, f64> {
        self.moves
            .iter()
            .map(|m| (m.kind().as_str().to_string(), m.tracker().acceptance()))
            .collect()
    }

    /// Moves whose step tuning stalled on a clamp.
    pub fn unconverged_moves(&self) -> Vec<MoveKind> {
        self.moves
            .iter()
            .filter(|m| !m.tracker().converged())
            .map(|m| m.kind())
            .collect()
    }
}
