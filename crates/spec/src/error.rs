use std::error::Error as StdError;

use retort_flowsheet::{FlowsheetError, SystemError};
use retort_solvers::equation::{bracket_search, iq_interpolation};
use thiserror::Error;

/// Errors raised while loading or resolving process specifications.
#[derive(Debug, Error)]
pub enum SpecError {
    /// No value of the design variable meets the target, for any reachable
    /// stage configuration.
    #[error(
        "{spec}: target unreachable in {bracket:?} with {stages} stage(s), residuals {residuals:?}"
    )]
    Infeasible {
        spec: String,
        bracket: [f64; 2],
        residuals: [f64; 2],
        stages: usize,
    },

    /// A root was bracketed but the iteration budget ran out.
    #[error("{spec}: no convergence after {iters} iterations (x = {x}, residual {residual})")]
    NotConverged {
        spec: String,
        iters: usize,
        x: f64,
        residual: f64,
    },

    #[error("{spec}: invalid value {value}: {reason}")]
    InvalidValue {
        spec: String,
        value: f64,
        reason: &'static str,
    },

    #[error("{spec}: solver failed")]
    Solver {
        spec: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Flowsheet(#[from] FlowsheetError),

    #[error(transparent)]
    System(SystemError),

    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("invalid bracket settings: {0}")]
    BracketSettings(#[from] bracket_search::ConfigError),

    #[error("invalid root settings: {0}")]
    RootSettings(#[from] iq_interpolation::ConfigError),
}

impl SpecError {
    /// Maps a bracket search failure onto this taxonomy.
    pub(crate) fn from_bracket(spec: &str, err: bracket_search::Error) -> Self {
        match err {
            bracket_search::Error::Infeasible {
                lower,
                upper,
                lower_residual,
                upper_residual,
                stages,
            } => Self::Infeasible {
                spec: spec.to_owned(),
                bracket: [lower, upper],
                residuals: [lower_residual, upper_residual],
                stages,
            },
            bracket_search::Error::Model(source) => Self::recover(spec, source),
            other => Self::Solver {
                spec: spec.to_owned(),
                source: Box::new(other),
            },
        }
    }

    /// Maps a root-finding failure onto this taxonomy.
    pub(crate) fn from_root(spec: &str, err: iq_interpolation::Error) -> Self {
        match err {
            iq_interpolation::Error::MaxIters {
                iters, x, residual, ..
            } => Self::NotConverged {
                spec: spec.to_owned(),
                iters,
                x,
                residual,
            },
            iq_interpolation::Error::Model(source) => Self::recover(spec, source),
            other => Self::Solver {
                spec: spec.to_owned(),
                source: Box::new(other),
            },
        }
    }

    /// Recovers a specification error that travelled through a flowsheet
    /// hook, so callers see the original failure.
    #[must_use]
    pub fn from_flowsheet(err: FlowsheetError) -> Self {
        match err {
            FlowsheetError::Hook { unit, source } => match source.downcast::<SpecError>() {
                Ok(spec) => *spec,
                Err(source) => Self::Flowsheet(FlowsheetError::Hook { unit, source }),
            },
            other => Self::Flowsheet(other),
        }
    }

    /// Like [`SpecError::from_flowsheet`], for system simulation errors.
    #[must_use]
    pub fn from_system(err: SystemError) -> Self {
        match err {
            SystemError::Flowsheet(err) => Self::from_flowsheet(err),
            other => Self::System(other),
        }
    }

    fn recover(spec: &str, source: Box<dyn StdError + Send + Sync>) -> Self {
        match source.downcast::<FlowsheetError>() {
            Ok(err) => Self::from_flowsheet(*err),
            Err(source) => Self::Solver {
                spec: spec.to_owned(),
                source,
            },
        }
    }
}

impl From<SystemError> for SpecError {
    fn from(err: SystemError) -> Self {
        Self::from_system(err)
    }
}
