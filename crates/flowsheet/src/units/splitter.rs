use std::any::Any;

use ndarray::Array1;

use crate::{Chemicals, FlowsheetError, StreamId, Streams, Unit};

/// Splits one inlet into two outlets by per-chemical fractions.
///
/// `split[i]` is the fraction of chemical `i` sent to `outs[0]`.
#[derive(Debug, Clone)]
pub struct Splitter {
    id: String,
    ins: [StreamId; 1],
    outs: [StreamId; 2],
    split: Array1<f64>,
}

impl Splitter {
    #[must_use]
    pub fn new(id: &str, inlet: StreamId, outs: [StreamId; 2], split: Array1<f64>) -> Self {
        Self {
            id: id.to_owned(),
            ins: [inlet],
            outs,
            split,
        }
    }

    /// Builds split fractions from a default and per-chemical overrides.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if an override names an
    /// unknown chemical.
    pub fn fractions(
        chemicals: &Chemicals,
        default: f64,
        overrides: &[(&str, f64)],
    ) -> Result<Array1<f64>, FlowsheetError> {
        let mut split = Array1::from_elem(chemicals.len(), default);
        for &(id, fraction) in overrides {
            split[chemicals.index(id)?] = fraction;
        }
        Ok(split)
    }

    #[must_use]
    pub fn split(&self) -> &Array1<f64> {
        &self.split
    }
}

impl Unit for Splitter {
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
        let feed = &streams[self.ins[0]];
        if self.split.len() != feed.mol().len() {
            return Err(FlowsheetError::Unit {
                unit: self.id.clone(),
                reason: format!(
                    "{} split fractions for {} chemicals",
                    self.split.len(),
                    feed.mol().len()
                ),
            });
        }
        let top = feed.mol() * &self.split;
        let bottom = feed.mol() - &top;
        let temperature = feed.temperature();

        let [a, b] = self.outs;
        streams[a].set_mol(top)?;
        streams[a].set_temperature(temperature);
        streams[b].set_mol(bottom)?;
        streams[b].set_temperature(temperature);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
