use serde::Deserialize;
use thiserror::Error;

/// Configuration for the bracket search.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Offset above the lower bound used to test whether the current stage
    /// count already overshoots the target.
    pub probe: f64,
    /// Scan increment between consecutive trial points.
    pub step: f64,
    /// Residual magnitude treated as meeting the target outright.
    pub residual_tol: f64,
}

/// Errors that can occur when validating a bracket search config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("probe must be finite and positive")]
    Probe,

    #[error("step must be finite and positive")]
    Step,

    #[error("residual_tol must be finite and non-negative")]
    Residual,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: 1e-6,
            step: 0.1,
            residual_tol: 1e-5,
        }
    }
}

impl Config {
    /// Validates the probe, step, and tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is non-finite or out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.probe.is_finite() || self.probe <= 0.0 {
            return Err(ConfigError::Probe);
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ConfigError::Step);
        }
        if !self.residual_tol.is_finite() || self.residual_tol < 0.0 {
            return Err(ConfigError::Residual);
        }
        Ok(())
    }
}
