use std::{collections::HashMap, fmt, sync::Arc};

use tracing::trace;
use uom::si::{f64::Power, power::kilowatt};

use crate::{Chemicals, FlowsheetError, SpecificationHook, Stream, StreamId, Streams, Unit};

/// Handle to a unit owned by a [`Flowsheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) usize);

struct Slot {
    unit: Box<dyn Unit>,
    hook: Option<Box<dyn SpecificationHook>>,
}

/// Explicit context owning the chemicals, streams, and units of one process.
///
/// Every stream has at most one source unit and one sink unit. Streams with
/// no source are feeds; streams with no sink are products.
pub struct Flowsheet {
    chemicals: Arc<Chemicals>,
    streams: Streams,
    sources: Vec<Option<UnitId>>,
    sinks: Vec<Option<UnitId>>,
    units: Vec<Slot>,
    unit_names: HashMap<String, UnitId>,
}

impl Flowsheet {
    #[must_use]
    pub fn new(chemicals: Chemicals) -> Self {
        Self {
            chemicals: Arc::new(chemicals),
            streams: Streams::default(),
            sources: Vec::new(),
            sinks: Vec::new(),
            units: Vec::new(),
            unit_names: HashMap::new(),
        }
    }

    #[must_use]
    pub fn chemicals(&self) -> &Chemicals {
        &self.chemicals
    }

    /// Adds an empty stream.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::DuplicateStream`] if the name is taken.
    pub fn add_stream(&mut self, name: &str) -> Result<StreamId, FlowsheetError> {
        let id = self
            .streams
            .insert(Stream::new(name, Arc::clone(&self.chemicals)))?;
        self.sources.push(None);
        self.sinks.push(None);
        Ok(id)
    }

    /// Looks up a stream handle by name.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownStream`] if no stream has that name.
    pub fn stream_id(&self, name: &str) -> Result<StreamId, FlowsheetError> {
        self.streams.id(name)
    }

    #[must_use]
    pub fn stream(&self, id: StreamId) -> &Stream {
        &self.streams[id]
    }

    pub fn stream_mut(&mut self, id: StreamId) -> &mut Stream {
        &mut self.streams[id]
    }

    #[must_use]
    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    /// Adds a unit and connects it to its inlet and outlet streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit name is taken or one of its streams
    /// already has a source (for outlets) or sink (for inlets).
    pub fn add_unit<U: Unit>(&mut self, unit: U) -> Result<UnitId, FlowsheetError> {
        if self.unit_names.contains_key(unit.id()) {
            return Err(FlowsheetError::DuplicateUnit(unit.id().to_owned()));
        }
        let id = UnitId(self.units.len());

        for &stream in unit.ins() {
            if self.sinks[stream.0].is_some() {
                return Err(self.connection_error(stream, "sink"));
            }
        }
        for &stream in unit.outs() {
            if self.sources[stream.0].is_some() {
                return Err(self.connection_error(stream, "source"));
            }
        }
        for &stream in unit.ins() {
            self.sinks[stream.0] = Some(id);
        }
        for &stream in unit.outs() {
            self.sources[stream.0] = Some(id);
        }

        self.unit_names.insert(unit.id().to_owned(), id);
        self.units.push(Slot {
            unit: Box::new(unit),
            hook: None,
        });
        Ok(id)
    }

    /// Looks up a unit handle by name.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownUnit`] if no unit has that name.
    pub fn unit_id(&self, name: &str) -> Result<UnitId, FlowsheetError> {
        self.unit_names
            .get(name)
            .copied()
            .ok_or_else(|| FlowsheetError::UnknownUnit(name.to_owned()))
    }

    #[must_use]
    pub fn unit_dyn(&self, id: UnitId) -> &dyn Unit {
        self.units[id.0].unit.as_ref()
    }

    /// Borrows a unit as its concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnitType`] if the unit is not a `U`.
    pub fn unit<U: Unit>(&self, id: UnitId) -> Result<&U, FlowsheetError> {
        let unit = self.units[id.0].unit.as_ref();
        unit.as_any()
            .downcast_ref::<U>()
            .ok_or_else(|| type_error::<U>(unit.id()))
    }

    /// Mutably borrows a unit as its concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnitType`] if the unit is not a `U`.
    pub fn unit_mut<U: Unit>(&mut self, id: UnitId) -> Result<&mut U, FlowsheetError> {
        let unit = self.units[id.0].unit.as_mut();
        let name = unit.id().to_owned();
        unit.as_any_mut()
            .downcast_mut::<U>()
            .ok_or_else(|| type_error::<U>(&name))
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &dyn Unit)> {
        self.units
            .iter()
            .enumerate()
            .map(|(i, slot)| (UnitId(i), slot.unit.as_ref()))
    }

    /// Attaches a specification hook to a unit, replacing any previous hook.
    pub fn set_hook(&mut self, unit: UnitId, hook: Box<dyn SpecificationHook>) {
        self.units[unit.0].hook = Some(hook);
    }

    /// Detaches and returns the hook of a unit.
    pub fn take_hook(&mut self, unit: UnitId) -> Option<Box<dyn SpecificationHook>> {
        self.units[unit.0].hook.take()
    }

    #[must_use]
    pub fn has_hook(&self, unit: UnitId) -> bool {
        self.units[unit.0].hook.is_some()
    }

    /// Applies the unit's hook, if any, without running the unit.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::Hook`] if the specification fails.
    pub fn apply_hook(&mut self, unit: UnitId) -> Result<(), FlowsheetError> {
        let Some(mut hook) = self.units[unit.0].hook.take() else {
            return Ok(());
        };
        let result = hook.apply(self, unit);
        self.units[unit.0].hook = Some(hook);
        result.map_err(|source| FlowsheetError::Hook {
            unit: self.unit_dyn(unit).id().to_owned(),
            source,
        })
    }

    /// Applies the unit's hook, then runs the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the hook or the unit fails.
    pub fn run_unit(&mut self, unit: UnitId) -> Result<(), FlowsheetError> {
        self.apply_hook(unit)?;
        let slot = &mut self.units[unit.0];
        trace!(unit = slot.unit.id(), "run");
        slot.unit.run(&mut self.streams)
    }

    /// Runs units in the given order.
    ///
    /// # Errors
    ///
    /// Returns the first unit or hook error.
    pub fn run_path(&mut self, path: &[UnitId]) -> Result<(), FlowsheetError> {
        path.iter().try_for_each(|&unit| self.run_unit(unit))
    }

    #[must_use]
    pub fn source(&self, stream: StreamId) -> Option<UnitId> {
        self.sources[stream.0]
    }

    #[must_use]
    pub fn sink(&self, stream: StreamId) -> Option<UnitId> {
        self.sinks[stream.0]
    }

    /// Streams with no source unit.
    pub fn feeds(&self) -> impl Iterator<Item = StreamId> {
        (0..self.streams.len())
            .filter(move |&i| self.sources[i].is_none() && self.sinks[i].is_some())
            .map(StreamId)
    }

    /// Streams with no sink unit.
    pub fn products(&self) -> impl Iterator<Item = StreamId> {
        (0..self.streams.len())
            .filter(move |&i| self.sinks[i].is_none() && self.sources[i].is_some())
            .map(StreamId)
    }

    /// Total electricity demand of every unit.
    #[must_use]
    pub fn power(&self) -> Power {
        self.units
            .iter()
            .fold(Power::new::<kilowatt>(0.0), |total, slot| {
                total + slot.unit.power()
            })
    }

    fn connection_error(&self, stream: StreamId, role: &'static str) -> FlowsheetError {
        FlowsheetError::Connection {
            stream: self.streams[stream].id().to_owned(),
            role,
        }
    }
}

impl fmt::Debug for Flowsheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flowsheet")
            .field("streams", &self.streams.len())
            .field(
                "units",
                &self.units.iter().map(|s| s.unit.id()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn type_error<U>(unit: &str) -> FlowsheetError {
    FlowsheetError::UnitType {
        unit: unit.to_owned(),
        expected: std::any::type_name::<U>(),
    }
}
