use retort_core::Snapshot;

/// Indicates how the solver finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Converged according to the configured tolerances.
    Converged,
    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

/// The result of an interpolation solve.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    /// Final solver status.
    pub status: Status,
    /// Best estimate of the root.
    pub x: f64,
    /// Residual at the reported root estimate.
    pub residual: f64,
    /// Snapshot at the reported root estimate.
    pub snapshot: Snapshot<I, O>,
    /// The `x` of the most recent model call.
    ///
    /// When this differs from [`Solution::x`], the model state reflects the
    /// last evaluation rather than the reported root.
    pub last_x: f64,
    /// Iteration count when the solver finished.
    pub iters: usize,
}

impl<I, O> Solution<I, O> {
    /// Returns true if the model was last called at the reported root.
    #[must_use]
    pub fn is_model_at_root(&self) -> bool {
        #[allow(clippy::float_cmp)]
        let same = self.x == self.last_x;
        same
    }
}
