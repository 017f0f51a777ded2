use thiserror::Error;
use tracing::trace;

use retort_core::{EquationProblem, Model, Snapshot};

/// One trial point of an equation problem: where it was taken, what the
/// residuals were, and the model input/output that produced them.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O, const N: usize> {
    pub x: [f64; N],
    pub residuals: [f64; N],
    pub snapshot: Snapshot<I, O>,
}

impl<I, O, const N: usize> Evaluation<I, O, N> {
    /// Whether every residual is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.residuals.iter().all(|r| r.is_finite())
    }
}

impl<I, O> Evaluation<I, O, 1> {
    #[must_use]
    pub fn residual(&self) -> f64 {
        self.residuals[0]
    }

    /// Distance of the residual from zero.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.residuals[0].abs()
    }
}

#[derive(Debug, Error)]
pub enum EvalError<ME, PE> {
    #[error("model call failed")]
    Model(#[source] ME),

    #[error("problem error")]
    Problem(#[source] PE),

    /// The residual came back NaN or infinite. Bracketing solvers cannot
    /// reason about the sign of such a value, so it is never passed on.
    #[error("non-finite residual {residual} at x = {x}")]
    NonFinite { x: f64, residual: f64 },
}

pub type EvaluateResult<M, P, const N: usize> = Result<
    Evaluation<<M as Model>::Input, <M as Model>::Output, N>,
    EvalError<<M as Model>::Error, <P as EquationProblem<N>>::Error>,
>;

/// Maps `x` to a model input, runs the model and computes residuals.
///
/// # Errors
///
/// Returns an error if input mapping, the model call, or the residual
/// computation fails.
pub fn evaluate<M, P, const N: usize>(
    model: &mut M,
    problem: &P,
    x: [f64; N],
) -> EvaluateResult<M, P, N>
where
    M: Model,
    P: EquationProblem<N, Input = M::Input, Output = M::Output>,
{
    let input = problem.input(&x).map_err(EvalError::Problem)?;
    let output = model.call(&input).map_err(EvalError::Model)?;
    let residuals = problem
        .residuals(&input, &output)
        .map_err(EvalError::Problem)?;

    Ok(Evaluation {
        x,
        residuals,
        snapshot: Snapshot::new(input, output),
    })
}

/// Evaluates a one-variable problem at `x` and rejects non-finite residuals.
///
/// # Errors
///
/// Returns [`EvalError::NonFinite`] when the residual is NaN or infinite,
/// and otherwise the errors of [`evaluate`].
pub fn evaluate_scalar<M, P>(model: &mut M, problem: &P, x: f64) -> EvaluateResult<M, P, 1>
where
    M: Model,
    P: EquationProblem<1, Input = M::Input, Output = M::Output>,
{
    let eval = evaluate(model, problem, [x])?;
    if !eval.is_finite() {
        return Err(EvalError::NonFinite {
            x,
            residual: eval.residual(),
        });
    }
    trace!(x, residual = eval.residual(), "evaluated");
    Ok(eval)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;

    /// `y = 1 / x`, which blows up at the origin.
    struct Reciprocal;

    impl Model for Reciprocal {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn call(&mut self, input: &f64) -> Result<f64, Infallible> {
            Ok(1.0 / input)
        }
    }

    struct Equals(f64);

    impl EquationProblem<1> for Equals {
        type Input = f64;
        type Output = f64;
        type Error = Infallible;

        fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
            Ok(x[0])
        }

        fn residuals(&self, _input: &f64, output: &f64) -> Result<[f64; 1], Infallible> {
            Ok([output - self.0])
        }
    }

    #[test]
    fn keeps_input_and_output_alongside_residual() {
        let eval = evaluate_scalar(&mut Reciprocal, &Equals(0.25), 2.0).expect("finite");
        assert_relative_eq!(eval.residual(), 0.25);
        assert_relative_eq!(eval.magnitude(), 0.25);
        assert_relative_eq!(eval.snapshot.input, 2.0);
        assert_relative_eq!(eval.snapshot.output, 0.5);
    }

    #[test]
    fn scalar_evaluation_rejects_infinite_residual() {
        let result = evaluate_scalar(&mut Reciprocal, &Equals(1.0), 0.0);
        assert!(matches!(
            result,
            Err(EvalError::NonFinite { x, residual }) if x == 0.0 && residual.is_infinite()
        ));
    }

    #[test]
    fn plain_evaluation_passes_non_finite_through() {
        let eval = evaluate(&mut Reciprocal, &Equals(1.0), [0.0]).expect("no check");
        assert!(!eval.is_finite());
    }
}
