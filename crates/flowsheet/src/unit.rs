use std::{any::Any, error::Error as StdError, fmt::Debug};

use uom::si::{f64::Power, power::kilowatt};

use crate::{Flowsheet, FlowsheetError, StreamId, Streams, UnitId};

/// A unit operation in a steady-state flowsheet.
///
/// `run` reads the current inlet streams and overwrites the outlet streams.
/// It must be deterministic: the same inlet state and unit attributes always
/// produce the same outlet state.
pub trait Unit: Any + Debug {
    fn id(&self) -> &str;

    fn ins(&self) -> &[StreamId];

    fn outs(&self) -> &[StreamId];

    /// Propagates the mass balance from inlets to outlets.
    ///
    /// # Errors
    ///
    /// Returns a [`FlowsheetError`] if the unit cannot be evaluated with its
    /// current attributes.
    fn run(&mut self, streams: &mut Streams) -> Result<(), FlowsheetError>;

    /// Electricity demand from the last run.
    fn power(&self) -> Power {
        Power::new::<kilowatt>(0.0)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Error type returned by specification hooks.
pub type HookError = Box<dyn StdError + Send + Sync>;

/// A specification attached to a unit and applied before the unit runs.
///
/// While a hook is applied it is taken out of the flowsheet, so it may
/// re-run any path through the flowsheet, including its own unit, without
/// re-entering itself.
pub trait SpecificationHook: Debug {
    /// Adjusts unit attributes so the specification holds.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the specification cannot be met.
    fn apply(&mut self, flowsheet: &mut Flowsheet, unit: UnitId) -> Result<(), HookError>;
}
