#![deny(missing_docs)]

//! Dual-ensemble overlap-sampling Monte Carlo for cluster integral ratios.

/// Reference-preference calibration.
pub mod calibrate;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Per-ensemble Metropolis chain.
pub mod ensemble;
/// Public `build`/`run` entry points.
pub mod kernel;
/// Move proposals and the frequency-weighted move set.
pub mod moves;
/// Overlap integrator and ratio estimators.
pub mod overlap;
/// Persisted reference preference.
pub mod refpref;
/// Run report and statistical diagnostics.
pub mod report;
/// Starting geometry providers.
pub mod seed;
/// Blocked running statistics.
pub mod stats;
/// Adaptive step sizes.
pub mod tracker;

pub use calibrate::{CalibrationOutcome, Calibrator, PreferenceSource};
pub use config::{
    CalibrationConfig, MoleculeConfig, MoveConfig, MoveEntry, OverlapConfig, SeedPolicy,
    SeedingConfig, WeightConfig,
};
pub use ensemble::{Ensemble, EnsembleIntegrator, Measurement, StepPhase, StepRecord};
pub use kernel::{build, build_with_extras, run, run_with_extras, run_with_file};
pub use moves::{MoveKind, MoveProposal, MoveSet};
pub use overlap::{AlphaGrid, EstimatorKind, OverlapAverage, OverlapIntegrator, RatioEstimate};
pub use refpref::{default_file_name, PersistedPreference, ReferencePreference};
pub use report::{EnsembleReport, ExtraTargetReport, OverlapReport, StreamReport};
pub use seed::{ConfigurationSeed, RingSeed};
pub use stats::{BlockAccumulator, StatisticsSnapshot};
pub use tracker::StepTracker;
