use std::any::Any;

use crate::{FlowsheetError, StreamId, Streams, Unit};

/// Combines its inlets into one outlet.
///
/// A mixer may own a dilution inlet sized by a water multiplier: before
/// mixing, the water in `ins[1]` is set to `(m - 1)` times the water in
/// `ins[0]`, so the mixed stream carries `m` times the main inlet's water.
#[derive(Debug, Clone)]
pub struct Mixer {
    id: String,
    ins: Vec<StreamId>,
    outs: [StreamId; 1],
    dilution: Option<Dilution>,
}

#[derive(Debug, Clone)]
struct Dilution {
    water: String,
    multiplier: f64,
}

impl Mixer {
    #[must_use]
    pub fn new(id: &str, ins: Vec<StreamId>, out: StreamId) -> Self {
        Self {
            id: id.to_owned(),
            ins,
            outs: [out],
            dilution: None,
        }
    }

    /// Sizes `ins[1]` as dilution water for `ins[0]`.
    #[must_use]
    pub fn with_water_multiplier(mut self, water: &str, multiplier: f64) -> Self {
        self.dilution = Some(Dilution {
            water: water.to_owned(),
            multiplier,
        });
        self
    }

    #[must_use]
    pub fn water_multiplier(&self) -> Option<f64> {
        self.dilution.as_ref().map(|d| d.multiplier)
    }

    /// Sets the water multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::Unit`] if the mixer has no dilution inlet or
    /// `multiplier` is below 1 or non-finite.
    pub fn set_water_multiplier(&mut self, multiplier: f64) -> Result<(), FlowsheetError> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(self.error(format!("water multiplier {multiplier} is below 1")));
        }
        let Some(dilution) = self.dilution.as_mut() else {
            return Err(self.error("no dilution inlet".to_owned()));
        };
        dilution.multiplier = multiplier;
        Ok(())
    }

    fn error(&self, reason: String) -> FlowsheetError {
        FlowsheetError::Unit {
            unit: self.id.clone(),
            reason,
        }
    }
}

impl Unit for Mixer {
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
        if let Some(dilution) = &self.dilution {
            let [main, water_in, ..] = self.ins[..] else {
                return Err(self.error("dilution needs a second inlet".to_owned()));
            };
            let water = streams[main].imol(&dilution.water)?;
            streams[water_in].set_imol(&dilution.water, (dilution.multiplier - 1.0) * water)?;
        }
        streams.mix(&self.ins, self.outs[0]);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
