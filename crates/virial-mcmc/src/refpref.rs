use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use virial_core::{ErrorInfo, VirialError};

/// Reference preference `α`, guaranteed finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReferencePreference(f64);

impl ReferencePreference {
    /// Validates `value`; zero, negative, NaN and infinite values are a
    /// degenerate calibration.
    pub fn new(value: f64) -> Result<Self, VirialError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(VirialError::DegenerateCalibration(
                ErrorInfo::new(
                    "preference-out-of-range",
                    "reference preference must lie in (0, inf)",
                )
                .with_context("value", value.to_string())
                .with_hint("the reference and target ensembles never overlapped"),
            ))
        }
    }

    /// The scalar.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ReferencePreference {
    type Error = VirialError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReferencePreference> for f64 {
    fn from(preference: ReferencePreference) -> Self {
        preference.0
    }
}

impl fmt::Display for ReferencePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contents of a persisted preference file.
///
/// Text format: the scalar on the first line, optionally `fixed` on the
/// second, meaning the value is used as is and never overwritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedPreference {
    /// Stored preference.
    pub preference: ReferencePreference,
    /// Skip recalibration and leave the file untouched.
    pub fixed: bool,
}

/// Default file name for a problem of `points` at `temperature`.
pub fn default_file_name(points: usize, temperature: f64) -> String {
    format!("refpref{points}_{temperature}")
}

impl PersistedPreference {
    /// Reads the file at `path`, returning `None` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, VirialError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|err| {
            VirialError::Serde(
                ErrorInfo::new("refpref-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::parse(&contents)
            .map(Some)
            .map_err(|info| VirialError::Serde(info.with_context("path", path.display().to_string())))
    }

    fn parse(contents: &str) -> Result<Self, ErrorInfo> {
        let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines
            .next()
            .ok_or_else(|| ErrorInfo::new("refpref-empty", "preference file is empty"))?;
        let value: f64 = first.parse().map_err(|err: std::num::ParseFloatError| {
            ErrorInfo::new("refpref-parse", err.to_string()).with_context("line", first)
        })?;
        let preference = ReferencePreference::new(value).map_err(|err| err.info().clone())?;
        let fixed = match lines.next() {
            None => false,
            Some("fixed") => true,
            Some(other) => {
                return Err(ErrorInfo::new("refpref-flag", "unknown flag in preference file")
                    .with_context("flag", other)
                    .with_hint("the only recognised flag is `fixed`"))
            }
        };
        Ok(Self { preference, fixed })
    }

    /// Writes the file, creating parent directories.
    pub fn store(&self, path: &Path) -> Result<(), VirialError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    VirialError::Serde(
                        ErrorInfo::new("refpref-mkdir", err.to_string())
                            .with_context("path", parent.display().to_string()),
                    )
                })?;
            }
        }
        let mut text = format!("{}\n", self.preference.value());
        if self.fixed {
            text.push_str("fixed\n");
        }
        fs::write(path, text).map_err(|err| {
            VirialError::Serde(
                ErrorInfo::new("refpref-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
