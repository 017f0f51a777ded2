//! Inverse quadratic interpolation safeguarded by bisection.
//!
//! # Algorithm
//!
//! The solver starts from a validated [`Bracket`] whose endpoint residuals
//! have opposite signs. Each iteration evaluates one point, replaces the
//! bracket endpoint that shares its residual sign, and proposes the next
//! point by inverse quadratic interpolation through the two endpoints and the
//! point that was just displaced. When only two distinct residuals are known
//! the proposal falls back to false position.
//!
//! A proposal is rejected in favor of the bracket midpoint when it does not
//! lie strictly inside the bracket, or when two consecutive iterations failed
//! to halve the bracket width. Every evaluated point therefore stays inside
//! the original bracket.
//!
//! # Warm start
//!
//! A `guess` strictly inside the bracket is evaluated first. Passing the
//! previous solution while an outer recycle loop converges usually resolves
//! the specification in one or two model calls.
//!
//! # Termination
//!
//! The solver converges when `|residual| <= residual_tol` or the bracket is
//! narrower than `x_abs_tol + x_rel_tol * |midpoint|`. Exhausting `max_iters`
//! is an error; no unvalidated estimate is returned.

mod best;
mod config;
mod error;
mod solution;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use solution::{Solution, Status};

use retort_core::{EquationProblem, Model, Observer};
use tracing::trace;

use crate::equation::{Bracket, Evaluation, evaluate_scalar};

use best::Best;

/// Control actions supported by the interpolation solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the best evaluation so far.
    StopEarly,
}

/// Iteration event emitted by the interpolation solver.
pub struct Event<'a, I, O> {
    /// Iteration counter (1-based).
    pub iter: usize,
    /// Bracket before this evaluation shrinks it.
    pub bracket: [f64; 2],
    /// Evaluation at the current point.
    pub eval: &'a Evaluation<I, O, 1>,
}

/// Finds a root of the equation inside `bracket`.
///
/// Observers see each iteration's evaluation and bracket state.
///
/// # Errors
///
/// Returns an error if the config is invalid, a residual is non-finite,
/// the model or problem fails, or the iteration limit is reached.
pub fn solve<M, P, Obs>(
    model: &mut M,
    problem: &P,
    bracket: Bracket,
    guess: Option<f64>,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
    Obs: for<'a> Observer<Event<'a, M::Input, M::Output>, Action>,
{
    config.validate()?;

    let mut bracket = bracket;
    let mut best = Best::empty();
    let mut displaced: Option<(f64, f64)> = None;
    let mut slow_steps = 0_usize;

    let mut x = match guess {
        Some(guess) if bracket.contains_strictly(guess) => guess,
        _ => inside_or_midpoint(&bracket, Some(bracket.false_position())),
    };

    for iter in 1..=config.max_iters {
        let eval = evaluate_scalar(model, problem, x)?;
        let residual = eval.residual();
        trace!(iter, x, residual, "interpolation step");

        let event = Event {
            iter,
            bracket: bracket.as_array(),
            eval: &eval,
        };
        let action = observer.observe(&event);
        best.update(eval);

        if let Some(Action::StopEarly) = action {
            return finish(best, Status::StoppedByObserver, x, iter);
        }
        if residual.abs() <= config.residual_tol {
            return finish(best, Status::Converged, x, iter);
        }

        let width_before = bracket.width();
        let replaced = bracket.shrink(x, residual);
        if bracket.is_x_converged(config.x_abs_tol, config.x_rel_tol) {
            return finish(best, Status::Converged, x, iter);
        }

        slow_steps = if bracket.width() > 0.5 * width_before {
            slow_steps + 1
        } else {
            0
        };
        displaced = Some(replaced);
        let proposal = if slow_steps >= 2 {
            slow_steps = 0;
            None
        } else {
            interpolate(&bracket, displaced)
        };
        x = inside_or_midpoint(&bracket, proposal);
    }

    let (x, residual) = best
        .point()
        .unwrap_or((bracket.midpoint(), f64::NAN));
    Err(Error::MaxIters {
        iters: config.max_iters,
        x,
        residual,
        bracket: bracket.as_array(),
    })
}

/// Runs the interpolation solver without observation.
///
/// # Errors
///
/// Returns an error if the config is invalid, a residual is non-finite,
/// the model or problem fails, or the iteration limit is reached.
pub fn solve_unobserved<M, P>(
    model: &mut M,
    problem: &P,
    bracket: Bracket,
    guess: Option<f64>,
    config: &Config,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    solve(model, problem, bracket, guess, config, ())
}

/// Proposes the next point from the bracket and the last displaced endpoint.
#[allow(clippy::float_cmp)]
fn interpolate(bracket: &Bracket, displaced: Option<(f64, f64)>) -> Option<f64> {
    let [a, b] = bracket.as_array();
    let [fa, fb] = bracket.residuals();

    if let Some((c, fc)) = displaced
        && fa != fb
        && fa != fc
        && fb != fc
    {
        let x = a * fb * fc / ((fa - fb) * (fa - fc))
            + b * fa * fc / ((fb - fa) * (fb - fc))
            + c * fa * fb / ((fc - fa) * (fc - fb));
        if x.is_finite() {
            return Some(x);
        }
    }

    let x = bracket.false_position();
    x.is_finite().then_some(x)
}

fn inside_or_midpoint(bracket: &Bracket, proposal: Option<f64>) -> f64 {
    proposal
        .filter(|&x| bracket.contains_strictly(x))
        .unwrap_or_else(|| bracket.midpoint())
}

fn finish<I, O>(
    best: Best<I, O>,
    status: Status,
    last_x: f64,
    iters: usize,
) -> Result<Solution<I, O>, Error> {
    let Some(eval) = best.into_inner() else {
        return Err(Error::MaxIters {
            iters,
            x: last_x,
            residual: f64::NAN,
            bracket: [last_x, last_x],
        });
    };

    Ok(Solution {
        status,
        x: eval.x[0],
        residual: eval.residual(),
        snapshot: eval.snapshot,
        last_x,
        iters,
    })
}
