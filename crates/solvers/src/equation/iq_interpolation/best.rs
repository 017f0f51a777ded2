use crate::equation::Evaluation;

/// Tracks the best evaluation encountered so far.
///
/// The best evaluation is defined by minimum residual magnitude.
/// The `Option` lets us represent the state before any evaluation.
pub(super) struct Best<I, O> {
    eval: Option<Evaluation<I, O, 1>>,
}

impl<I, O> Best<I, O> {
    /// Creates an empty best tracker.
    pub(super) fn empty() -> Self {
        Self { eval: None }
    }

    /// Updates the best evaluation if the residual magnitude improves.
    pub(super) fn update(&mut self, eval: Evaluation<I, O, 1>) {
        if let Some(best) = self.eval.as_ref()
            && eval.residual().abs() >= best.residual().abs()
        {
            return;
        }
        self.eval = Some(eval);
    }

    /// Returns the best `(x, residual)` pair, if any.
    pub(super) fn point(&self) -> Option<(f64, f64)> {
        self.eval.as_ref().map(|eval| (eval.x[0], eval.residual()))
    }

    /// Consumes the tracker and returns the best evaluation.
    pub(super) fn into_inner(self) -> Option<Evaluation<I, O, 1>> {
        self.eval
    }
}
