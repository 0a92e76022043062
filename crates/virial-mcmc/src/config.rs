use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use virial_cluster::{Side, WeightSpec};
use virial_core::{ErrorInfo, VirialError};

use crate::moves::{resolve_step_bounds, MoveKind};

/// YAML-configurable parameters governing an overlap-sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapConfig {
    /// Number of molecules (cluster points).
    pub points: usize,
    /// Temperature in energy units.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Production batches. Each batch drives one ensemble for `sub_steps`.
    pub steps: usize,
    /// Elementary Monte Carlo steps per batch.
    #[serde(default = "default_sub_steps")]
    pub sub_steps: usize,
    /// Samples per statistics block during production.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Batches run with step tuning before calibration; data discarded.
    #[serde(default = "default_equilibration")]
    pub equilibration: usize,
    /// Initial share of elementary steps given to the reference ensemble.
    #[serde(default = "default_reference_fraction")]
    pub reference_fraction: f64,
    /// Re-derive the reference share from the observed errors.
    #[serde(default = "default_adjust_fraction")]
    pub adjust_fraction: bool,
    /// Lower clamp for the adjusted reference share (upper is `1 - min`).
    #[serde(default = "default_min_reference_fraction")]
    pub min_reference_fraction: f64,
    /// Shape of each molecule.
    #[serde(default)]
    pub molecule: MoleculeConfig,
    /// Sampling weights of the two ensembles.
    #[serde(default)]
    pub weights: WeightConfig,
    /// Reference-preference calibration.
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// Move set used by both ensembles.
    #[serde(default)]
    pub moves: MoveConfig,
    /// Initial geometry placement and validation.
    #[serde(default)]
    pub seeding: SeedingConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_temperature() -> f64 {
    1.0
}

fn default_sub_steps() -> usize {
    1000
}

fn default_block_size() -> usize {
    1000
}

fn default_equilibration() -> usize {
    10
}

fn default_reference_fraction() -> f64 {
    0.5
}

fn default_adjust_fraction() -> bool {
    true
}

fn default_min_reference_fraction() -> f64 {
    0.02
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            points: 3,
            temperature: default_temperature(),
            steps: 100,
            sub_steps: default_sub_steps(),
            block_size: default_block_size(),
            equilibration: default_equilibration(),
            reference_fraction: default_reference_fraction(),
            adjust_fraction: default_adjust_fraction(),
            min_reference_fraction: default_min_reference_fraction(),
            molecule: MoleculeConfig::default(),
            weights: WeightConfig::default(),
            calibration: CalibrationConfig::default(),
            moves: MoveConfig::default(),
            seeding: SeedingConfig::default(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

impl OverlapConfig {
    /// Parses a YAML document, then validates it.
    pub fn from_yaml_str(contents: &str) -> Result<Self, VirialError> {
        let config: Self = serde_yaml::from_str(contents).map_err(|err| {
            VirialError::Serde(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String, VirialError> {
        serde_yaml::to_string(self)
            .map_err(|err| VirialError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), VirialError> {
        let fail = |code: &str, message: &str, key: &str, value: String| -> Result<(), VirialError> {
            Err(VirialError::Config(
                ErrorInfo::new(code, message).with_context(key, value),
            ))
        };
        if self.points < 2 {
            return fail("points", "at least two points are required", "points", self.points.to_string());
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return fail(
                "temperature",
                "temperature must be positive and finite",
                "temperature",
                self.temperature.to_string(),
            );
        }
        if self.sub_steps == 0 || self.block_size == 0 {
            return fail(
                "batch-size",
                "sub_steps and block_size must be nonzero",
                "sub_steps",
                self.sub_steps.to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.reference_fraction) {
            return fail(
                "reference-fraction",
                "reference fraction must lie in [0, 1]",
                "reference_fraction",
                self.reference_fraction.to_string(),
            );
        }
        if !(0.0..0.5).contains(&self.min_reference_fraction) {
            return fail(
                "min-reference-fraction",
                "minimum reference fraction must lie in [0, 0.5)",
                "min_reference_fraction",
                self.min_reference_fraction.to_string(),
            );
        }
        if self.molecule.sites == 0 {
            return fail("molecule-sites", "molecules need at least one site", "sites", "0".into());
        }
        if self.calibration.alpha_count == 0 || self.calibration.refine_alpha_count == 0 {
            return fail(
                "alpha-count",
                "alpha grids need at least one value",
                "alpha_count",
                self.calibration.alpha_count.to_string(),
            );
        }
        if self.calibration.steps < 2 {
            return fail(
                "calibration-steps",
                "calibration needs at least one batch per ensemble",
                "steps",
                self.calibration.steps.to_string(),
            );
        }
        for (key, span) in [
            ("alpha_span", self.calibration.alpha_span),
            ("refine_span", self.calibration.refine_span),
        ] {
            if !(span.is_finite() && span > 0.0) {
                return fail("alpha-span", "alpha grid spans must be positive and finite", key, span.to_string());
            }
        }
        if let Some(preference) = self.calibration.preference {
            if !(preference.is_finite() && preference > 0.0) {
                return fail(
                    "preference",
                    "fixed reference preference must be positive and finite",
                    "preference",
                    preference.to_string(),
                );
            }
        }
        if self.moves.entries.is_empty() {
            return fail("moves", "move set is empty", "entries", "0".into());
        }
        for entry in &self.moves.entries {
            if !(entry.frequency.is_finite() && entry.frequency > 0.0) {
                return fail(
                    "move-frequency",
                    "move frequencies must be positive",
                    entry.kind.as_str(),
                    entry.frequency.to_string(),
                );
            }
            resolve_step_bounds(entry)?;
        }
        if !(self.moves.target_acceptance > 0.0 && self.moves.target_acceptance < 1.0) {
            return fail(
                "target-acceptance",
                "target acceptance must lie in (0, 1)",
                "target_acceptance",
                self.moves.target_acceptance.to_string(),
            );
        }
        Ok(())
    }
}

/// Shape shared by every molecule in the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeConfig {
    /// Sites per molecule; 1 means point atoms.
    #[serde(default = "default_sites")]
    pub sites: usize,
    /// Fixed distance between bonded sites.
    #[serde(default = "default_bond_length")]
    pub bond_length: f64,
}

fn default_sites() -> usize {
    1
}

fn default_bond_length() -> f64 {
    1.0
}

impl Default for MoleculeConfig {
    fn default() -> Self {
        Self {
            sites: default_sites(),
            bond_length: default_bond_length(),
        }
    }
}

/// Sampling weight of each ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    /// Weight sampled by the reference ensemble.
    #[serde(default = "default_reference_weight")]
    pub reference: WeightSpec,
    /// Weight sampled by the target ensemble.
    #[serde(default = "default_target_weight")]
    pub target: WeightSpec,
}

fn default_reference_weight() -> WeightSpec {
    WeightSpec::Absolute {
        side: Side::Reference,
    }
}

fn default_target_weight() -> WeightSpec {
    WeightSpec::Absolute { side: Side::Target }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            reference: default_reference_weight(),
            target: default_target_weight(),
        }
    }
}

/// Reference-preference calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Batches per calibration pass.
    #[serde(default = "default_calibration_steps")]
    pub steps: usize,
    /// Size of the coarse alpha grid.
    #[serde(default = "default_alpha_count")]
    pub alpha_count: usize,
    /// Half width of the coarse grid in `ln(alpha)`.
    #[serde(default = "default_alpha_span")]
    pub alpha_span: f64,
    /// Size of the refinement grid.
    #[serde(default = "default_refine_alpha_count")]
    pub refine_alpha_count: usize,
    /// Half width of the refinement grid in `ln(alpha)`.
    #[serde(default = "default_refine_span")]
    pub refine_span: f64,
    /// Bound on coarse recentring passes.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Persisted preference file read before and written after calibration.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Skip calibration entirely and use this preference.
    #[serde(default)]
    pub preference: Option<f64>,
}

fn default_calibration_steps() -> usize {
    20
}

fn default_alpha_count() -> usize {
    21
}

fn default_alpha_span() -> f64 {
    30.0
}

fn default_refine_alpha_count() -> usize {
    15
}

fn default_refine_span() -> f64 {
    4.0
}

fn default_max_rounds() -> usize {
    10
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            steps: default_calibration_steps(),
            alpha_count: default_alpha_count(),
            alpha_span: default_alpha_span(),
            refine_alpha_count: default_refine_alpha_count(),
            refine_span: default_refine_span(),
            max_rounds: default_max_rounds(),
            file: None,
            preference: None,
        }
    }
}

/// One registered move type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveEntry {
    /// Move type.
    pub kind: MoveKind,
    /// Relative selection frequency.
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Initial step size; the move's own default when absent.
    #[serde(default)]
    pub step: Option<f64>,
    /// Lower clamp for the tuned step.
    #[serde(default)]
    pub min_step: Option<f64>,
    /// Upper clamp for the tuned step.
    #[serde(default)]
    pub max_step: Option<f64>,
}

impl MoveEntry {
    /// Entry with unit frequency and the move's default step bounds.
    pub fn new(kind: MoveKind) -> Self {
        Self {
            kind,
            frequency: 1.0,
            step: None,
            min_step: None,
            max_step: None,
        }
    }
}

fn default_frequency() -> f64 {
    1.0
}

/// Move set and step-size tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveConfig {
    /// Registered moves in selection order.
    #[serde(default = "default_move_entries")]
    pub entries: Vec<MoveEntry>,
    /// Acceptance rate the step trackers steer towards.
    #[serde(default = "default_target_acceptance")]
    pub target_acceptance: f64,
    /// Trials between step-size adjustments.
    #[serde(default = "default_adjust_interval")]
    pub adjust_interval: usize,
}

fn default_move_entries() -> Vec<MoveEntry> {
    vec![MoveEntry::new(MoveKind::TranslateAll)]
}

fn default_target_acceptance() -> f64 {
    0.5
}

fn default_adjust_interval() -> usize {
    100
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            entries: default_move_entries(),
            target_acceptance: default_target_acceptance(),
            adjust_interval: default_adjust_interval(),
        }
    }
}

/// Initial geometry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedingConfig {
    /// Radius of the ring the molecules are first placed on.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Scale of random perturbations applied on each retry.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
    /// Retries before the configuration is declared degenerate.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_radius() -> f64 {
    0.25
}

fn default_perturbation() -> f64 {
    0.1
}

fn default_max_retries() -> usize {
    100
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            perturbation: default_perturbation(),
            max_retries: default_max_retries(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in reports.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}
