use std::any::Any;

use uom::si::f64::ThermodynamicTemperature;

use crate::{FlowsheetError, StreamId, Streams, Unit};

/// Brings a stream to a set outlet temperature without phase change.
#[derive(Debug, Clone)]
pub struct HeatExchanger {
    id: String,
    ins: [StreamId; 1],
    outs: [StreamId; 1],
    pub outlet_temperature: ThermodynamicTemperature,
}

impl HeatExchanger {
    #[must_use]
    pub fn new(
        id: &str,
        inlet: StreamId,
        outlet: StreamId,
        outlet_temperature: ThermodynamicTemperature,
    ) -> Self {
        Self {
            id: id.to_owned(),
            ins: [inlet],
            outs: [outlet],
            outlet_temperature,
        }
    }
}

impl Unit for HeatExchanger {
    fn id(&self) -> &str {
        &self.id
    }

    fn ins(&self) -> &[StreamId] {
        &self.ins
    }

    fn outs(&self) -> &[StreamId] {
        &self.outs
    }

    fn run(&mut self, streams: &mut Streams) -> Result<(), FlowsheetError> {
        streams.copy(self.ins[0], self.outs[0]);
        streams[self.outs[0]].set_temperature(self.outlet_temperature);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
