//! Structured error types shared across the virial crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`VirialError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (point counts, temperatures, paths).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the overlap sampler.
///
/// Statistical quality problems are not errors; they travel as
/// [`Diagnostic`] values next to the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum VirialError {
    /// No starting geometry with a nonzero sampling weight could be found.
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(ErrorInfo),
    /// Calibration produced a reference preference outside `(0, inf)`.
    #[error("degenerate calibration: {0}")]
    DegenerateCalibration(ErrorInfo),
    /// The committed geometry evaluated to a non-finite weight.
    #[error("numeric overflow: {0}")]
    NumericOverflow(ErrorInfo),
    /// Invalid run or cluster parameters.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization and file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl VirialError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            VirialError::DegenerateConfiguration(info)
            | VirialError::DegenerateCalibration(info)
            | VirialError::NumericOverflow(info)
            | VirialError::Config(info)
            | VirialError::Rng(info)
            | VirialError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`VirialError::Config`] with the given code and message.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        VirialError::Config(ErrorInfo::new(code, message))
    }
}

/// Non-fatal statistical warning surfaced alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic family, currently always `statistical-nonconvergence`.
    pub family: String,
    /// Structured detail.
    pub detail: ErrorInfo,
}

impl Diagnostic {
    /// Creates a statistical non-convergence warning.
    pub fn nonconvergence(detail: ErrorInfo) -> Self {
        Self {
            family: "statistical-nonconvergence".to_string(),
            detail,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.family, self.detail)
    }
}
