use retort_core::Model;
use retort_flowsheet::{Flowsheet, HookError, SpecificationHook, StreamId, UnitId};
use retort_solvers::equation::{
    bracket_search::{self, Outcome},
    iq_interpolation,
};
use tracing::{debug, info};

use crate::{Deviation, DesignVariable, PathEvaluator, Setpoint, Settings, SpecError, Target};

/// Feed stream that receives dilution water when minimal processing
/// already overshoots a titer target.
#[derive(Debug, Clone, PartialEq)]
pub struct Dilution {
    pub stream: StreamId,
    pub water: String,
}

/// How a specification met its target on the last resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A bracket-search trial point met the target.
    Met { x: f64 },
    /// The lower bound overshoots and there is nothing to compensate with,
    /// so the design variable stays at minimal processing.
    Minimal,
    /// The lower bound overshoots; dilution water was added in closed form
    /// (kg/hr).
    Diluted { water: f64 },
    /// Root finding converged inside a bracket.
    Solved { x: f64, iters: usize },
}

/// Drives one design variable until a target observed downstream of it
/// meets its setpoint.
///
/// Each resolve restores the full stage set, clears any dilution water,
/// searches for a bracket, and then either compensates in closed form or
/// converges on a root warm-started from the previous resolve. Only the
/// units on `path` are re-run.
///
/// A specification can be installed as a [`SpecificationHook`] on the unit
/// its design variable belongs to, so that every outer simulation pass
/// re-resolves it before the unit runs.
#[derive(Debug, Clone)]
pub struct Specification {
    name: String,
    pub variable: DesignVariable,
    pub target: Target,
    pub setpoint: Setpoint,
    path: Vec<UnitId>,
    dilution: Option<Dilution>,
    pub bracket: bracket_search::Config,
    pub root: iq_interpolation::Config,
}

impl Specification {
    #[must_use]
    pub fn new(
        name: &str,
        variable: DesignVariable,
        target: Target,
        setpoint: Setpoint,
        path: Vec<UnitId>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            variable,
            target,
            setpoint,
            path,
            dilution: None,
            bracket: bracket_search::Config::default(),
            root: iq_interpolation::Config::default(),
        }
    }

    /// Adds dilution water to `stream` when minimal processing overshoots.
    #[must_use]
    pub fn with_dilution(mut self, stream: StreamId, water: &str) -> Self {
        self.dilution = Some(Dilution {
            stream,
            water: water.to_owned(),
        });
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.bracket = settings.bracket;
        self.root = settings.root;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &[UnitId] {
        &self.path
    }

    /// Resolves the specification against the current upstream state.
    ///
    /// On success the path has been re-run at the reported value, so the
    /// target observed on the flowsheet is within tolerance of the setpoint
    /// (or the setpoint is overshot at minimal processing).
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Infeasible`] if no bracket exists for any stage
    /// count, [`SpecError::NotConverged`] if root finding runs out of
    /// iterations, or the underlying flowsheet error.
    pub fn resolve(&mut self, flowsheet: &mut Flowsheet) -> Result<Resolution, SpecError> {
        let goal = self.setpoint.value(flowsheet)?;
        if !goal.is_finite() || goal <= 0.0 {
            return Err(SpecError::InvalidValue {
                spec: self.name.clone(),
                value: goal,
                reason: "setpoint must be finite and positive",
            });
        }

        let knob = self.variable.knob;
        knob.reset_stages(flowsheet)?;
        if let Some(dilution) = &self.dilution {
            flowsheet
                .stream_mut(dilution.stream)
                .set_imass(&dilution.water, 0.0)?;
        }

        let problem = Deviation { goal };
        let mut evaluator = PathEvaluator::new(flowsheet, knob, &self.path, &self.target);
        let outcome = bracket_search::find(
            &mut evaluator,
            &problem,
            self.variable.bounds,
            self.variable.trend,
            &self.bracket,
        )
        .map_err(|err| SpecError::from_bracket(&self.name, err))?;

        let resolution = match outcome {
            Outcome::Met(eval) => Resolution::Met { x: eval.x[0] },
            Outcome::Overshoot(eval) => compensate(
                &self.name,
                &self.target,
                self.dilution.as_ref(),
                &self.path,
                evaluator.flowsheet(),
                goal,
                eval.snapshot.output,
            )?,
            Outcome::Bracketed(bracket) => {
                let solution = iq_interpolation::solve_unobserved(
                    &mut evaluator,
                    &problem,
                    bracket,
                    self.variable.last(),
                    &self.root,
                )
                .map_err(|err| SpecError::from_root(&self.name, err))?;
                if !solution.is_model_at_root() {
                    evaluator
                        .call(&solution.x)
                        .map_err(SpecError::from_flowsheet)?;
                }
                Resolution::Solved {
                    x: solution.x,
                    iters: solution.iters,
                }
            }
        };

        match resolution {
            Resolution::Met { x } | Resolution::Solved { x, .. } => self.variable.remember(x),
            Resolution::Minimal | Resolution::Diluted { .. } => {}
        }
        info!(spec = %self.name, goal, ?resolution, "specification resolved");
        Ok(resolution)
    }
}

/// Handles a lower bound that already overshoots the goal.
///
/// Titer targets with a dilution stream get the water that brings the
/// observed titer down to `goal`:
/// `water = (1/goal - 1/observed) * product * rho_water`.
fn compensate(
    name: &str,
    target: &Target,
    dilution: Option<&Dilution>,
    path: &[UnitId],
    flowsheet: &mut Flowsheet,
    goal: f64,
    observed: f64,
) -> Result<Resolution, SpecError> {
    let (Some(dilution), Some(product)) = (dilution, target.product_mass(flowsheet)?) else {
        debug!(spec = name, observed, goal, "overshoot at minimal processing");
        return Ok(Resolution::Minimal);
    };

    let chemicals = flowsheet.chemicals();
    let Some(density) = chemicals[chemicals.index(&dilution.water)?].density else {
        return Err(SpecError::InvalidValue {
            spec: name.to_owned(),
            value: goal,
            reason: "dilution chemical has no condensed density",
        });
    };

    let water = ((1.0 / goal - 1.0 / observed) * product * density).max(0.0);
    flowsheet
        .stream_mut(dilution.stream)
        .set_imass(&dilution.water, water)?;
    flowsheet
        .run_path(path)
        .map_err(SpecError::from_flowsheet)?;
    debug!(spec = name, water, "closed-form dilution");
    Ok(Resolution::Diluted { water })
}

impl SpecificationHook for Specification {
    fn apply(&mut self, flowsheet: &mut Flowsheet, _unit: UnitId) -> Result<(), HookError> {
        self.resolve(flowsheet)?;
        Ok(())
    }
}
