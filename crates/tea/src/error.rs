use retort_flowsheet::{FlowsheetError, SystemError};
use thiserror::Error;

/// Errors raised while post-processing a converged flowsheet.
#[derive(Debug, Error)]
pub enum TeaError {
    /// The main product has no mass flow, so per-kg metrics are undefined.
    #[error("product stream `{0}` has no mass flow")]
    ZeroProductFlow(String),

    #[error("invalid financial parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    Flowsheet(#[from] FlowsheetError),
}
