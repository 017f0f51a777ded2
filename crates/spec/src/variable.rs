use retort_flowsheet::{
    Flowsheet, FlowsheetError, UnitId,
    units::{Mixer, MultiEffectEvaporator},
};
use retort_solvers::equation::bracket_search::Trend;

/// Unit attribute a design variable writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    /// First-effect vapor fraction of a [`MultiEffectEvaporator`].
    VaporFraction(UnitId),
    /// Water multiplier of a dilution [`Mixer`].
    WaterMultiplier(UnitId),
}

impl Knob {
    /// Writes `x` to the unit attribute.
    ///
    /// # Errors
    ///
    /// Returns a [`FlowsheetError`] if the unit has the wrong type or rejects `x`.
    pub fn set(self, flowsheet: &mut Flowsheet, x: f64) -> Result<(), FlowsheetError> {
        match self {
            Knob::VaporFraction(unit) => flowsheet
                .unit_mut::<MultiEffectEvaporator>(unit)?
                .set_vapor_fraction(x),
            Knob::WaterMultiplier(unit) => flowsheet
                .unit_mut::<Mixer>(unit)?
                .set_water_multiplier(x),
        }
    }

    /// Reads the current attribute value.
    ///
    /// # Errors
    ///
    /// Returns a [`FlowsheetError`] if the unit has the wrong type.
    pub fn get(self, flowsheet: &Flowsheet) -> Result<f64, FlowsheetError> {
        match self {
            Knob::VaporFraction(unit) => Ok(flowsheet
                .unit::<MultiEffectEvaporator>(unit)?
                .vapor_fraction()),
            Knob::WaterMultiplier(unit) => {
                let mixer = flowsheet.unit::<Mixer>(unit)?;
                mixer.water_multiplier().ok_or_else(|| FlowsheetError::Unit {
                    unit: retort_flowsheet::Unit::id(mixer).to_owned(),
                    reason: "no dilution inlet".to_owned(),
                })
            }
        }
    }

    #[must_use]
    pub fn unit(self) -> UnitId {
        match self {
            Knob::VaporFraction(unit) | Knob::WaterMultiplier(unit) => unit,
        }
    }

    pub(crate) fn stage_count(self, flowsheet: &Flowsheet) -> usize {
        match self {
            Knob::VaporFraction(unit) => flowsheet
                .unit::<MultiEffectEvaporator>(unit)
                .map_or(1, |evaporator| evaporator.stages.len()),
            Knob::WaterMultiplier(_) => 1,
        }
    }

    pub(crate) fn remove_stage(self, flowsheet: &mut Flowsheet) -> bool {
        match self {
            Knob::VaporFraction(unit) => flowsheet
                .unit_mut::<MultiEffectEvaporator>(unit)
                .is_ok_and(|evaporator| evaporator.stages.remove()),
            Knob::WaterMultiplier(_) => false,
        }
    }

    pub(crate) fn reset_stages(self, flowsheet: &mut Flowsheet) -> Result<(), FlowsheetError> {
        if let Knob::VaporFraction(unit) = self {
            flowsheet
                .unit_mut::<MultiEffectEvaporator>(unit)?
                .stages
                .reset();
        }
        Ok(())
    }
}

/// A bounded scalar the solver controls.
///
/// The last solved value is kept between resolutions and seeds the next
/// root-finding run.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVariable {
    pub knob: Knob,
    pub bounds: [f64; 2],
    pub trend: Trend,
    last: Option<f64>,
}

impl DesignVariable {
    #[must_use]
    pub fn new(knob: Knob, bounds: [f64; 2], trend: Trend) -> Self {
        Self {
            knob,
            bounds,
            trend,
            last: None,
        }
    }

    /// Evaporator vapor fraction in `[0, 0.9]`; more evaporation
    /// concentrates the product, so the deviation decreases.
    #[must_use]
    pub fn vapor_fraction(evaporator: UnitId) -> Self {
        Self::new(Knob::VaporFraction(evaporator), [0.0, 0.9], Trend::Decreasing)
    }

    /// Dilution-mixer water multiplier in `[1, upper]`; more water dilutes
    /// the product, so the deviation increases.
    #[must_use]
    pub fn water_multiplier(mixer: UnitId, upper: f64) -> Self {
        Self::new(Knob::WaterMultiplier(mixer), [1.0, upper], Trend::Increasing)
    }

    /// Last solved value, if any.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    pub(crate) fn remember(&mut self, x: f64) {
        self.last = Some(x);
    }
}
