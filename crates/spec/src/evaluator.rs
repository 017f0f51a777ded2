use std::convert::Infallible;

use retort_core::{EquationProblem, Model};
use retort_flowsheet::{Flowsheet, FlowsheetError, UnitId};
use retort_solvers::equation::bracket_search::Staged;
use tracing::trace;

use crate::{Knob, Target};

/// Re-runs a fixed unit path for each candidate design value.
///
/// A call writes `x` through the knob, runs every unit on `path` in order,
/// and observes the target on the freshly produced streams. Nothing outside
/// the path is re-run, so recycle streams keep their current values.
#[derive(Debug)]
pub struct PathEvaluator<'a> {
    flowsheet: &'a mut Flowsheet,
    knob: Knob,
    path: &'a [UnitId],
    target: &'a Target,
    calls: usize,
}

impl<'a> PathEvaluator<'a> {
    pub fn new(
        flowsheet: &'a mut Flowsheet,
        knob: Knob,
        path: &'a [UnitId],
        target: &'a Target,
    ) -> Self {
        Self {
            flowsheet,
            knob,
            path,
            target,
            calls: 0,
        }
    }

    /// Number of path runs so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn flowsheet(&mut self) -> &mut Flowsheet {
        self.flowsheet
    }
}

impl Model for PathEvaluator<'_> {
    type Input = f64;
    type Output = f64;
    type Error = FlowsheetError;

    fn call(&mut self, x: &f64) -> Result<f64, FlowsheetError> {
        self.knob.set(self.flowsheet, *x)?;
        self.flowsheet.run_path(self.path)?;
        self.calls += 1;
        let observed = self.target.observe(self.flowsheet)?;
        trace!(x, observed, "path evaluated");
        Ok(observed)
    }
}

impl Staged for PathEvaluator<'_> {
    fn stage_count(&self) -> usize {
        self.knob.stage_count(self.flowsheet)
    }

    fn remove_stage(&mut self) -> bool {
        self.knob.remove_stage(self.flowsheet)
    }
}

/// Signed distance from the observed value to a goal, `goal - observed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub goal: f64,
}

impl EquationProblem<1> for Deviation {
    type Input = f64;
    type Output = f64;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
        Ok(x[0])
    }

    fn residuals(&self, _x: &f64, observed: &f64) -> Result<[f64; 1], Infallible> {
        Ok([self.goal - observed])
    }
}
