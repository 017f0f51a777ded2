use std::error::Error as StdError;

use thiserror::Error;

use crate::equation::{BracketError, EvalError};

use super::ConfigError;

/// Errors that can occur while searching for a bracket.
#[derive(Debug, Error)]
pub enum Error {
    /// The residual never changed sign within the bounds, even after every
    /// removable stage was removed.
    #[error(
        "no sign change in [{lower}, {upper}] with {stages} stage(s): residuals {lower_residual} and {upper_residual}"
    )]
    Infeasible {
        lower: f64,
        upper: f64,
        lower_residual: f64,
        upper_residual: f64,
        stages: usize,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("invalid bounds [{lower}, {upper}]")]
    InvalidBounds { lower: f64, upper: f64 },

    #[error("invalid bracket: {0}")]
    InvalidBracket(#[from] BracketError),

    /// A step or probe too small to move `x` in floating point.
    #[error("step {step} does not advance from x = {x}")]
    NoProgress { x: f64, step: f64 },

    #[error("non-finite residual {residual} at x = {x}")]
    NonFiniteResidual { x: f64, residual: f64 },

    #[error("problem error")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),

    #[error("model call failed")]
    Model(#[source] Box<dyn StdError + Send + Sync>),
}

impl<ME, PE> From<EvalError<ME, PE>> for Error
where
    ME: StdError + Send + Sync + 'static,
    PE: StdError + Send + Sync + 'static,
{
    fn from(err: EvalError<ME, PE>) -> Self {
        match err {
            EvalError::Model(e) => Self::Model(Box::new(e)),
            EvalError::Problem(e) => Self::Problem(Box::new(e)),
            EvalError::NonFinite { x, residual } => Self::NonFiniteResidual { x, residual },
        }
    }
}
