use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised while building or running a flowsheet.
#[derive(Debug, Error)]
pub enum FlowsheetError {
    #[error("unknown chemical `{0}`")]
    UnknownChemical(String),

    #[error("chemical `{0}` is defined more than once")]
    DuplicateChemical(String),

    #[error("unknown stream `{0}`")]
    UnknownStream(String),

    #[error("stream `{0}` is defined more than once")]
    DuplicateStream(String),

    #[error("unknown unit `{0}`")]
    UnknownUnit(String),

    #[error("unit `{0}` is defined more than once")]
    DuplicateUnit(String),

    #[error("stream `{stream}` already has a {role}")]
    Connection { stream: String, role: &'static str },

    #[error("unit `{unit}` is not a {expected}")]
    UnitType {
        unit: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Reaction(#[from] ReactionError),

    #[error("unit `{unit}`: {reason}")]
    Unit { unit: String, reason: String },

    #[error("specification on unit `{unit}` failed")]
    Hook {
        unit: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Errors raised by reaction sets.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReactionError {
    #[error("reaction index {index} out of range for {len} reactions")]
    Index { index: usize, len: usize },

    #[error("conversion {value} of reaction {index} is outside [0, 1]")]
    Conversion { index: usize, value: f64 },

    #[error("total conversion {total} of reactant `{reactant}` exceeds 1")]
    Overconversion { reactant: String, total: f64 },
}

/// Errors raised by [`System`](crate::System) convergence.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(
        "recycle did not converge after {iters} iterations: molar error {molar_error} kmol/hr, relative error {relative_error}"
    )]
    NotConverged {
        iters: usize,
        molar_error: f64,
        relative_error: f64,
    },

    #[error("units form a cycle that no recycle stream tears")]
    UntornCycle,

    #[error("unit `{0}` is not on the system path")]
    NotOnPath(String),

    #[error(transparent)]
    Flowsheet(#[from] FlowsheetError),
}
