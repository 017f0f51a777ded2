//! Numerical solvers for Retort.
//!
//! The solvers here work on scalar [`EquationProblem`]s whose model re-runs a
//! piece of a stateful simulation. They are split along the two halves of a
//! target-seeking solve:
//!
//! - [`equation::bracket_search`] finds an interval where the residual changes
//!   sign, trimming discrete stages of the model when needed
//! - [`equation::iq_interpolation`] converges inside that interval using
//!   inverse quadratic interpolation safeguarded by bisection
//!
//! [`EquationProblem`]: retort_core::EquationProblem

pub mod equation;
