use retort_flowsheet::{
    Convergence, ConvergenceConfig, Flowsheet, System, UnitId, units::Fermentor,
};
use tracing::info;
use uom::si::{f64::MassDensity, mass_density::kilogram_per_cubic_meter};

use crate::{Settings, SpecError, YieldSpecification};

/// The three fermentation specifications, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Yield,
    Titer,
    Productivity,
}

/// Progress of a [`ProcessSpecification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecState {
    #[default]
    Unloaded,
    /// The named specification was the last one loaded.
    Resolved(SpecKind),
    /// Every specification was loaded and the system re-converged.
    AllResolved,
}

/// Loads yield, titer, and productivity targets into a fermentation
/// flowsheet.
///
/// Yield rewrites the fermentor's conversions directly. Titer is written to
/// the fermentor and then resolved by the specification hook installed on
/// `titer_unit` (typically the evaporator or dilution mixer upstream of the
/// fermentor). Productivity fixes the residence time from the titer.
///
/// Titer resolution depends on the conversions fixed by yield, so
/// [`ProcessSpecification::load_specifications`] always loads in the order
/// yield, titer, productivity.
#[derive(Debug)]
pub struct ProcessSpecification {
    fermentor: UnitId,
    yields: Option<YieldSpecification>,
    titer_unit: Option<UnitId>,
    convergence: Option<ConvergenceConfig>,
    state: SpecState,
}

impl ProcessSpecification {
    #[must_use]
    pub fn new(fermentor: UnitId) -> Self {
        Self {
            fermentor,
            yields: None,
            titer_unit: None,
            convergence: None,
            state: SpecState::Unloaded,
        }
    }

    #[must_use]
    pub fn with_yield(mut self, yields: YieldSpecification) -> Self {
        self.yields = Some(yields);
        self
    }

    /// Resolves titer through the hook installed on `unit`.
    #[must_use]
    pub fn with_titer_hook(mut self, unit: UnitId) -> Self {
        self.titer_unit = Some(unit);
        self
    }

    /// Re-converges with `settings.convergence` instead of the system's own
    /// tolerances.
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.convergence = Some(settings.convergence);
        self
    }

    #[must_use]
    pub fn state(&self) -> SpecState {
        self.state
    }

    #[must_use]
    pub fn fermentor(&self) -> UnitId {
        self.fermentor
    }

    /// Loads a yield target.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::NotConfigured`] without a yield specification,
    /// or the error of [`YieldSpecification::apply`].
    pub fn load_yield(&mut self, flowsheet: &mut Flowsheet, y: f64) -> Result<(), SpecError> {
        let yields = self
            .yields
            .as_ref()
            .ok_or(SpecError::NotConfigured("yield specification"))?;
        yields.apply(flowsheet, y)?;
        self.state = SpecState::Resolved(SpecKind::Yield);
        Ok(())
    }

    /// Loads a titer target in g/L and resolves the titer hook.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidValue`] for a non-positive titer, or the
    /// failure of the titer specification.
    pub fn load_titer(&mut self, flowsheet: &mut Flowsheet, titer: f64) -> Result<(), SpecError> {
        check_positive("titer", titer)?;
        let fermentor = flowsheet.unit_mut::<Fermentor>(self.fermentor)?;
        fermentor.set_titer(MassDensity::new::<kilogram_per_cubic_meter>(titer));
        if fermentor.productivity() > 0.0 {
            fermentor.update_tau()?;
        }
        if let Some(unit) = self.titer_unit {
            flowsheet
                .apply_hook(unit)
                .map_err(SpecError::from_flowsheet)?;
        }
        self.state = SpecState::Resolved(SpecKind::Titer);
        Ok(())
    }

    /// Loads a productivity target in g/L/hr and updates the residence time.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidValue`] for a non-positive productivity.
    pub fn load_productivity(
        &mut self,
        flowsheet: &mut Flowsheet,
        productivity: f64,
    ) -> Result<(), SpecError> {
        check_positive("productivity", productivity)?;
        let fermentor = flowsheet.unit_mut::<Fermentor>(self.fermentor)?;
        fermentor.set_productivity(productivity);
        fermentor.update_tau()?;
        self.state = SpecState::Resolved(SpecKind::Productivity);
        Ok(())
    }

    /// Loads all three targets in order, then re-converges the system.
    ///
    /// The recycle tolerances come from [`ProcessSpecification::with_settings`]
    /// when given, otherwise from `system`.
    ///
    /// # Errors
    ///
    /// Returns the first specification failure, or the system's
    /// convergence failure. Either way the flowsheet is left in the state
    /// reached so far and should not be used for post-processing.
    pub fn load_specifications(
        &mut self,
        flowsheet: &mut Flowsheet,
        system: &System,
        y: f64,
        titer: f64,
        productivity: f64,
    ) -> Result<Convergence, SpecError> {
        self.load_yield(flowsheet, y)?;
        self.load_titer(flowsheet, titer)?;
        self.load_productivity(flowsheet, productivity)?;
        let convergence = match self.convergence {
            Some(config) => system.clone().with_config(config).simulate(flowsheet)?,
            None => system.simulate(flowsheet)?,
        };
        self.state = SpecState::AllResolved;
        info!(y, titer, productivity, iters = convergence.iters, "specifications loaded");
        Ok(convergence)
    }
}

fn check_positive(spec: &str, value: f64) -> Result<(), SpecError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SpecError::InvalidValue {
            spec: spec.to_owned(),
            value,
            reason: "must be finite and positive",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use retort_flowsheet::{Chemical, Chemicals, ParallelReaction, Reaction};
    use uom::si::time::hour;

    use crate::ReactionGroup;

    fn glucose_to(chemicals: &Chemicals, products: &[(&str, f64)], x: f64) -> Reaction {
        Reaction::new(chemicals, "Glucose", products, x).expect("valid")
    }

    fn fermentation() -> (Flowsheet, UnitId) {
        let chemicals = Chemicals::new(vec![
            Chemical::liquid("Water", 18.015, 1000.0),
            Chemical::solid("Glucose", 180.156, 1540.0),
            Chemical::liquid("LacticAcid", 90.08, 1250.0),
            Chemical::liquid("AceticAcid", 60.05, 1049.0),
            Chemical::solid("Cellmass", 24.6, 1100.0),
        ])
        .expect("unique ids");
        let reactions = ParallelReaction::new(vec![
            glucose_to(&chemicals, &[("LacticAcid", 2.0)], 0.76),
            glucose_to(&chemicals, &[("AceticAcid", 3.0)], 0.19),
            glucose_to(&chemicals, &[("Cellmass", 6.0)], 0.05),
        ]);

        let mut fs = Flowsheet::new(chemicals);
        let feed = fs.add_stream("feed").expect("unique");
        let vent = fs.add_stream("vent").expect("unique");
        let broth = fs.add_stream("broth").expect("unique");
        fs.stream_mut(feed).set_imass("Glucose", 1_000.0).expect("known");
        fs.stream_mut(feed).set_imass("Water", 9_000.0).expect("known");
        let fermentor = fs
            .add_unit(Fermentor::new(
                "R1",
                vec![feed],
                [vent, broth],
                reactions,
                "LacticAcid",
            ))
            .expect("unique");
        (fs, fermentor)
    }

    fn controller(fs: &Flowsheet, fermentor: UnitId) -> ProcessSpecification {
        let group = ReactionGroup {
            product: 0,
            dependent: 1,
            fixed: 2,
        };
        let yields =
            YieldSpecification::new(fs, fermentor, vec![group], vec![]).expect("fermentor");
        ProcessSpecification::new(fermentor).with_yield(yields)
    }

    fn tau(fs: &Flowsheet, fermentor: UnitId) -> f64 {
        fs.unit::<Fermentor>(fermentor)
            .expect("fermentor")
            .tau()
            .get::<hour>()
    }

    #[test]
    fn state_tracks_the_last_load() {
        let (mut fs, fermentor) = fermentation();
        let mut process = controller(&fs, fermentor);
        assert_eq!(process.state(), SpecState::Unloaded);

        process.load_productivity(&mut fs, 2.0).expect("valid");
        assert_eq!(process.state(), SpecState::Resolved(SpecKind::Productivity));

        process.load_titer(&mut fs, 120.0).expect("no hook to resolve");
        assert_eq!(process.state(), SpecState::Resolved(SpecKind::Titer));
        assert_relative_eq!(tau(&fs, fermentor), 60.0, epsilon = 1e-9);

        process.load_yield(&mut fs, 0.8).expect("valid");
        assert_eq!(process.state(), SpecState::Resolved(SpecKind::Yield));
    }

    #[test]
    fn failed_load_keeps_the_previous_state() {
        let (mut fs, fermentor) = fermentation();
        let mut process = controller(&fs, fermentor);

        process.load_yield(&mut fs, 0.7).expect("valid");
        assert!(process.load_titer(&mut fs, f64::NAN).is_err());
        assert!(process.load_yield(&mut fs, 1.0).is_err());
        assert_eq!(process.state(), SpecState::Resolved(SpecKind::Yield));
    }

    #[test]
    fn load_specifications_ends_all_resolved() {
        let (mut fs, fermentor) = fermentation();
        let mut process = controller(&fs, fermentor);
        let system = System::new(vec![fermentor], vec![]);

        let convergence = process
            .load_specifications(&mut fs, &system, 0.8, 100.0, 0.5)
            .expect("no recycle");

        assert_eq!(convergence.iters, 1);
        assert_eq!(process.state(), SpecState::AllResolved);
        assert_relative_eq!(tau(&fs, fermentor), 200.0, epsilon = 1e-9);
        let reactions = &fs.unit::<Fermentor>(fermentor).expect("fermentor").reactions;
        assert_relative_eq!(reactions.conversion(0).expect("in range"), 0.8);
    }
}
