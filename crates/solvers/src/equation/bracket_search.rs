//! Bracket search over a bounded design variable.
//!
//! The search walks a design variable upward from its lower bound until the
//! residual changes sign. Models that own a discrete stage set (for example
//! the effects of a multi-effect evaporator) implement [`Staged`], which lets
//! the search remove stages when the current configuration cannot produce a
//! bracket.
//!
//! # Algorithm
//!
//! 1. Evaluate the lower bound. A residual within tolerance is
//!    [`Outcome::Met`]; a residual already past the target for the given
//!    [`Trend`] is [`Outcome::Overshoot`] and the caller resolves it by other
//!    means.
//! 2. Evaluate `lower + probe`. If even this minimal step overshoots, remove a
//!    stage and start over. With no stage left to remove, the interval
//!    `[lower, lower + probe]` is the bracket.
//! 3. Scan upward in `step` increments up to the upper bound. The first sign
//!    change yields [`Outcome::Bracketed`].
//! 4. Reaching the upper bound without a sign change removes a stage and
//!    starts over. Once no stage can be removed the search fails with
//!    [`Error::Infeasible`].
//!
//! Stage removal is monotonic: a removed stage is never restored by the
//! search. Which end of the stage set is removed is decided by the model.

mod config;
mod error;

pub use config::{Config, ConfigError};
pub use error::Error;

use retort_core::{EquationProblem, Model};
use tracing::{debug, warn};

use crate::equation::{Bracket, Evaluation, Sign, evaluate_scalar};

/// A model whose configuration includes a removable set of discrete stages.
///
/// The defaults describe a model with a single fixed stage.
pub trait Staged {
    /// Returns the number of active stages.
    fn stage_count(&self) -> usize {
        1
    }

    /// Removes one stage from the configured end of the stage set.
    ///
    /// Returns `false` if no stage can be removed.
    fn remove_stage(&mut self) -> bool {
        false
    }
}

/// Direction in which the residual moves as the design variable increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// The residual decreases as `x` increases.
    Decreasing,
    /// The residual increases as `x` increases.
    Increasing,
}

impl Trend {
    /// Returns true if `residual` lies beyond the target for this trend,
    /// meaning the root sits below the current point.
    #[must_use]
    pub fn overshoots(self, residual: f64) -> bool {
        match self {
            Trend::Decreasing => residual < 0.0,
            Trend::Increasing => residual > 0.0,
        }
    }
}

/// Result of a bracket search.
///
/// For [`Outcome::Met`] and [`Outcome::Overshoot`] the model was last called
/// at the reported evaluation. For [`Outcome::Bracketed`] it was last called
/// at one of the bracket endpoints.
#[derive(Debug, Clone)]
pub enum Outcome<I, O> {
    /// A trial point already meets the target.
    Met(Evaluation<I, O, 1>),
    /// The lower bound already overshoots the target.
    Overshoot(Evaluation<I, O, 1>),
    /// A validated sign-changing interval.
    Bracketed(Bracket),
}

/// Searches `bounds` for an interval where the residual changes sign.
///
/// # Errors
///
/// Returns [`Error::Infeasible`] if no bracket exists within the bounds for
/// any reachable stage count, or an error if the config or bounds are
/// invalid, a residual is non-finite, or the model or problem fails.
pub fn find<M, P>(
    model: &mut M,
    problem: &P,
    bounds: [f64; 2],
    trend: Trend,
    config: &Config,
) -> Result<Outcome<M::Input, M::Output>, Error>
where
    M: Model + Staged,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    config.validate()?;

    let [lower, upper] = bounds;
    if !lower.is_finite() || !upper.is_finite() || lower + config.probe >= upper {
        return Err(Error::InvalidBounds { lower, upper });
    }

    let met = |residual: f64| residual.abs() <= config.residual_tol;

    loop {
        let start = evaluate_scalar(model, problem, lower)?;
        let lower_residual = start.residual();
        if met(lower_residual) {
            return Ok(Outcome::Met(start));
        }
        if trend.overshoots(lower_residual) {
            debug!(x = lower, residual = lower_residual, "lower bound overshoots");
            return Ok(Outcome::Overshoot(start));
        }

        let x_probe = lower + config.probe;
        if x_probe <= lower {
            return Err(Error::NoProgress {
                x: lower,
                step: config.probe,
            });
        }
        let probe = evaluate_scalar(model, problem, x_probe)?;
        if met(probe.residual()) {
            return Ok(Outcome::Met(probe));
        }
        if trend.overshoots(probe.residual()) {
            if model.remove_stage() {
                debug!(stages = model.stage_count(), "probe overshoots, removed stage");
                continue;
            }
            let bracket = Bracket::new([lower, x_probe], [lower_residual, probe.residual()])?;
            debug!(bracket = ?bracket.as_array(), "bracketed at probe");
            return Ok(Outcome::Bracketed(bracket));
        }

        let (mut x0, mut y0) = (x_probe, probe.residual());
        let upper_residual = loop {
            let x1 = (x0 + config.step).min(upper);
            if x1 <= x0 {
                return Err(Error::NoProgress {
                    x: x0,
                    step: config.step,
                });
            }
            let eval = evaluate_scalar(model, problem, x1)?;
            let y1 = eval.residual();
            if met(y1) {
                return Ok(Outcome::Met(eval));
            }
            if Sign::of(y0) != Sign::of(y1) {
                let bracket = Bracket::new([x0, x1], [y0, y1])?;
                debug!(
                    bracket = ?bracket.as_array(),
                    stages = model.stage_count(),
                    "bracketed"
                );
                return Ok(Outcome::Bracketed(bracket));
            }
            if x1 >= upper {
                break y1;
            }
            (x0, y0) = (x1, y1);
        };

        if model.remove_stage() {
            debug!(stages = model.stage_count(), "no sign change, removed stage");
            continue;
        }

        let stages = model.stage_count();
        warn!(lower, upper, lower_residual, upper_residual, stages, "no bracket");
        return Err(Error::Infeasible {
            lower,
            upper,
            lower_residual,
            upper_residual,
            stages,
        });
    }
}
