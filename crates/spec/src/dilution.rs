use retort_flowsheet::{Flowsheet, HookError, SpecificationHook, UnitId};
use tracing::{debug, info, warn};

use crate::{Knob, Setpoint, SpecError, Target};

/// Titer specification that scales a mixer's water multiplier.
///
/// Each pass updates the multiplier proportionally, `m *= observed / goal`,
/// which converges quickly when water dominates the broth volume. The
/// multiplier is clamped to `[1, upper]`; an update that stalls at a bound
/// with the goal still unmet means the goal cannot be reached by dilution.
#[derive(Debug, Clone)]
pub struct DilutionSpecification {
    name: String,
    mixer: UnitId,
    pub target: Target,
    pub setpoint: Setpoint,
    path: Vec<UnitId>,
    pub upper: f64,
    pub residual_tol: f64,
    pub max_iters: usize,
}

impl DilutionSpecification {
    #[must_use]
    pub fn new(
        name: &str,
        mixer: UnitId,
        target: Target,
        setpoint: Setpoint,
        path: Vec<UnitId>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            mixer,
            target,
            setpoint,
            path,
            upper: 20.0,
            residual_tol: 1e-5,
            max_iters: 100,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates the water multiplier until the target meets the setpoint and
    /// returns the final multiplier.
    ///
    /// The update starts from the mixer's current multiplier, so repeated
    /// resolves during recycle convergence take few passes.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Infeasible`] if the update stalls at a bound,
    /// [`SpecError::NotConverged`] after `max_iters` passes, or the
    /// underlying flowsheet error.
    pub fn resolve(&mut self, flowsheet: &mut Flowsheet) -> Result<f64, SpecError> {
        let goal = self.setpoint.value(flowsheet)?;
        if !goal.is_finite() || goal <= 0.0 {
            return Err(SpecError::InvalidValue {
                spec: self.name.clone(),
                value: goal,
                reason: "setpoint must be finite and positive",
            });
        }

        let knob = Knob::WaterMultiplier(self.mixer);
        let (lower, upper) = (1.0, self.upper);
        let mut m = knob.get(flowsheet)?.clamp(lower, upper);
        let mut residual = f64::NAN;

        for iter in 1..=self.max_iters {
            let observed = self.observe(flowsheet, m)?;
            residual = goal - observed;
            if residual.abs() <= self.residual_tol {
                info!(spec = %self.name, goal, multiplier = m, iter, "dilution resolved");
                return Ok(m);
            }

            let next = (m * observed / goal).clamp(lower, upper);
            let stalled = (m <= lower && next <= lower) || (m >= upper && next >= upper);
            if stalled {
                let other = if m <= lower { upper } else { lower };
                let other_residual = goal - self.observe(flowsheet, other)?;
                // Leave the flowsheet at the bound closest to the goal.
                self.observe(flowsheet, m)?;
                let (bracket, residuals) = if m <= lower {
                    ([lower, upper], [residual, other_residual])
                } else {
                    ([lower, upper], [other_residual, residual])
                };
                warn!(spec = %self.name, goal, ?bracket, ?residuals, "dilution cannot reach goal");
                return Err(SpecError::Infeasible {
                    spec: self.name.clone(),
                    bracket,
                    residuals,
                    stages: 1,
                });
            }
            debug!(iter, multiplier = next, observed, "dilution update");
            m = next;
        }

        Err(SpecError::NotConverged {
            spec: self.name.clone(),
            iters: self.max_iters,
            x: m,
            residual,
        })
    }

    fn observe(&self, flowsheet: &mut Flowsheet, m: f64) -> Result<f64, SpecError> {
        Knob::WaterMultiplier(self.mixer).set(flowsheet, m)?;
        flowsheet
            .run_path(&self.path)
            .map_err(SpecError::from_flowsheet)?;
        Ok(self.target.observe(flowsheet)?)
    }
}

impl SpecificationHook for DilutionSpecification {
    fn apply(&mut self, flowsheet: &mut Flowsheet, _unit: UnitId) -> Result<(), HookError> {
        self.resolve(flowsheet)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use retort_flowsheet::{Chemical, Chemicals, StreamId, units::Mixer};

    /// Broth of 20 m³/hr water and 4 m³/hr product: 208.3 g/L undiluted.
    fn diluter() -> (Flowsheet, UnitId, StreamId) {
        let mut fs = Flowsheet::new(
            Chemicals::new(vec![
                Chemical::liquid("Water", 18.015, 1000.0),
                Chemical::liquid("TAL", 126.11, 1250.0),
            ])
            .expect("unique ids"),
        );
        let broth = fs.add_stream("broth").expect("unique");
        let water = fs.add_stream("dilution_water").expect("unique");
        let out = fs.add_stream("diluted").expect("unique");
        fs.stream_mut(broth).set_imass("Water", 20_000.0).expect("known");
        fs.stream_mut(broth).set_imass("TAL", 5_000.0).expect("known");

        let mixer = fs
            .add_unit(Mixer::new("M304", vec![broth, water], out).with_water_multiplier("Water", 1.0))
            .expect("unique");
        (fs, mixer, out)
    }

    fn spec(mixer: UnitId, out: StreamId, goal: f64) -> DilutionSpecification {
        DilutionSpecification::new(
            "titer",
            mixer,
            Target::titer(out, "TAL"),
            Setpoint::Fixed(goal),
            vec![mixer],
        )
    }

    #[test]
    fn proportional_update_reaches_goal() {
        let (mut fs, mixer, out) = diluter();
        let mut spec = spec(mixer, out, 100.0);

        let m = spec.resolve(&mut fs).expect("reachable");

        // 50 m³/hr total volume needs 46 m³/hr of water.
        assert_relative_eq!(m, 2.3, epsilon = 1e-6);
        let titer = spec.target.observe(&fs).expect("known");
        assert!((titer - 100.0).abs() <= 1e-5);
    }

    #[test]
    fn goal_above_undiluted_titer_is_infeasible() {
        let (mut fs, mixer, out) = diluter();
        let mut spec = spec(mixer, out, 250.0);

        let (bracket, residuals) = match spec.resolve(&mut fs) {
            Err(SpecError::Infeasible {
                bracket, residuals, ..
            }) => (bracket, residuals),
            other => panic!("expected infeasible, got {other:?}"),
        };
        assert_eq!(bracket, [1.0, 20.0]);
        assert!(residuals[0] > 0.0 && residuals[1] > 0.0);
        assert_relative_eq!(
            fs.unit::<Mixer>(mixer).expect("mixer").water_multiplier().expect("dilution"),
            1.0
        );
    }

    #[test]
    fn iteration_cap_is_reported() {
        let (mut fs, mixer, out) = diluter();
        let mut spec = spec(mixer, out, 100.0);
        spec.max_iters = 1;

        assert!(matches!(
            spec.resolve(&mut fs),
            Err(SpecError::NotConverged { iters: 1, .. })
        ));
    }
}
