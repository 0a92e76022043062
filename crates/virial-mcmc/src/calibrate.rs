use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use virial_core::{ErrorInfo, VirialError};

use crate::config::CalibrationConfig;
use crate::overlap::{AlphaGrid, OverlapIntegrator};
use crate::refpref::{PersistedPreference, ReferencePreference};

/// Where the production preference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferenceSource {
    /// Fixed in the run configuration.
    Configured,
    /// Read from a persisted file flagged `fixed`.
    Persisted,
    /// Read from a persisted file and refined.
    Refined,
    /// Found by a grid search.
    Searched,
}

/// Result of [`Calibrator::calibrate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    /// Preference for production.
    pub preference: ReferencePreference,
    /// Origin of the preference.
    pub source: PreferenceSource,
    /// Grid passes run.
    pub rounds: usize,
}

/// Short bounded sub-run that picks the reference preference.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    sub_steps: usize,
    file: Option<PathBuf>,
}

impl Calibrator {
    /// Calibrator for batches of `sub_steps` elementary steps. `file`
    /// overrides `config.file`.
    pub fn new(config: &CalibrationConfig, sub_steps: usize, file: Option<PathBuf>) -> Self {
        Self {
            file: file.or_else(|| config.file.clone()),
            config: config.clone(),
            sub_steps,
        }
    }

    /// Block size used while calibrating.
    pub fn block_size(&self) -> usize {
        let elementary = self.config.steps.saturating_mul(self.sub_steps);
        (elementary / 1000).clamp(1000, 1_000_000).min(self.sub_steps).max(1)
    }

    /// Resolves the preference: configured value, then a `fixed` persisted
    /// file, then a search (refinement only when a persisted value seeds it).
    ///
    /// Leaves `overlap` with tuning on and statistics from the last pass.
    pub fn calibrate(&self, overlap: &mut OverlapIntegrator) -> Result<CalibrationOutcome, VirialError> {
        if let Some(value) = self.config.preference {
            let preference = ReferencePreference::new(value)?;
            log::info!("using configured reference preference {preference}");
            return Ok(CalibrationOutcome {
                preference,
                source: PreferenceSource::Configured,
                rounds: 0,
            });
        }

        let persisted = match &self.file {
            Some(path) => PersistedPreference::load(path)?,
            None => None,
        };
        if let Some(stored) = persisted.filter(|p| p.fixed) {
            log::info!("using fixed persisted reference preference {}", stored.preference);
            return Ok(CalibrationOutcome {
                preference: stored.preference,
                source: PreferenceSource::Persisted,
                rounds: 0,
            });
        }

        overlap.set_block_size(self.block_size())?;
        overlap.set_reference_fraction(0.5);
        overlap.set_adjust(false, 0.0);
        overlap.set_tuning(true);

        let (centre, source, mut rounds) = match persisted {
            Some(stored) => (stored.preference.value(), PreferenceSource::Refined, 0),
            None => {
                let (centre, rounds) = self.search(
                    overlap,
                    1.0,
                    self.config.alpha_count,
                    self.config.alpha_span,
                    "coarse",
                )?;
                (centre, PreferenceSource::Searched, rounds)
            }
        };
        let (refined, refine_rounds) = self.search(
            overlap,
            centre,
            self.config.refine_alpha_count,
            self.config.refine_span,
            "refine",
        )?;
        rounds += refine_rounds;
        let preference = ReferencePreference::new(refined)?;
        log::info!("calibrated reference preference {preference} after {rounds} round(s)");

        if let Some(path) = &self.file {
            PersistedPreference {
                preference,
                fixed: false,
            }
            .store(path)?;
        }
        Ok(CalibrationOutcome {
            preference,
            source,
            rounds,
        })
    }

    fn search(
        &self,
        overlap: &mut OverlapIntegrator,
        start: f64,
        count: usize,
        span: f64,
        pass: &str,
    ) -> Result<(f64, usize), VirialError> {
        let mut centre = start;
        let mut rounds = 0;
        loop {
            overlap.set_alphas(AlphaGrid::spanning(centre, count, span))?;
            overlap.reset_statistics();
            overlap.run(self.config.steps)?;
            rounds += 1;
            let average = overlap.overlap_average();
            if !(average.value.is_finite() && average.value > 0.0) {
                return Err(VirialError::DegenerateCalibration(
                    ErrorInfo::new("overlap-average", "calibration found no overlap between ensembles")
                        .with_context("pass", pass)
                        .with_context("centre", centre.to_string())
                        .with_context("value", average.value.to_string())
                        .with_hint("raise calibration.steps or check the target weight"),
                ));
            }
            log::info!(
                "{pass} calibration round {rounds}: preference {:.6e}{}",
                average.value,
                if average.at_edge { " (grid edge)" } else { "" }
            );
            if !average.at_edge || count == 1 {
                return Ok((average.value, rounds));
            }
            if rounds >= self.config.max_rounds {
                log::warn!(
                    "{pass} calibration still at the grid edge after {rounds} round(s); using {:.6e}",
                    average.value
                );
                return Ok((average.value, rounds));
            }
            centre = average.value;
        }
    }
}
