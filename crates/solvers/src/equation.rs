//! Solvers for equation problems, i.e. roots of scalar residuals.
//!
//! An [`EquationProblem`] maps solver variables `x: [f64; N]` to model inputs,
//! calls the model, and computes residuals. Solvers in this module drive those
//! residuals toward zero.
//!
//! # Solvers
//!
//! - [`bracket_search`] locates a sign-changing interval, possibly by
//!   removing stages from a [`Staged`] model.
//! - [`iq_interpolation`] converges on a validated [`Bracket`].
//!
//! [`EquationProblem`]: retort_core::EquationProblem
//! [`Staged`]: bracket_search::Staged

mod evaluate;
mod interval;

pub use evaluate::{EvalError, EvaluateResult, Evaluation, evaluate, evaluate_scalar};
pub use interval::{Bracket, BracketError, Sign};

pub mod bracket_search;
pub mod iq_interpolation;
