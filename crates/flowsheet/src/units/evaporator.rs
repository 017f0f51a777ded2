use std::any::Any;

use serde::Deserialize;
use uom::si::{
    f64::{Pressure, Ratio},
    ratio::ratio,
};

use crate::{FlowsheetError, StreamId, Streams, Unit};

/// End of a [`StageSet`] that stages are removed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEnd {
    #[default]
    Last,
    First,
}

/// Ordered effect pressures of a multi-effect train.
///
/// Stages can only be removed, one at a time from the configured end, until
/// one remains. [`StageSet::reset`] restores the configured stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSet {
    configured: Vec<Pressure>,
    active: Vec<Pressure>,
    removal: StageEnd,
}

impl StageSet {
    #[must_use]
    pub fn new(pressures: Vec<Pressure>, removal: StageEnd) -> Self {
        Self {
            active: pressures.clone(),
            configured: pressures,
            removal,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    #[must_use]
    pub fn pressures(&self) -> &[Pressure] {
        &self.active
    }

    #[must_use]
    pub fn removal(&self) -> StageEnd {
        self.removal
    }

    /// Removes one stage. Returns `false` if only one stage is left.
    pub fn remove(&mut self) -> bool {
        if self.active.len() <= 1 {
            return false;
        }
        match self.removal {
            StageEnd::Last => {
                self.active.pop();
            }
            StageEnd::First => {
                self.active.remove(0);
            }
        }
        true
    }

    /// Restores every configured stage.
    pub fn reset(&mut self) {
        self.active.clone_from(&self.configured);
    }
}

/// Multi-effect evaporator concentrating a feed by removing water.
///
/// The first effect evaporates the fraction `V` of the liquid water. Each
/// later effect evaporates `V` plus a flash term proportional to the
/// pressure drop from the previous effect. With `V = 0` the evaporator is
/// bypassed and no effect runs.
///
/// Outlets are `[concentrate, condensate]`.
#[derive(Debug, Clone)]
pub struct MultiEffectEvaporator {
    id: String,
    ins: [StreamId; 1],
    outs: [StreamId; 2],
    water: String,
    pub stages: StageSet,
    v: f64,
    pub flash_coefficient: f64,
}

impl MultiEffectEvaporator {
    #[must_use]
    pub fn new(
        id: &str,
        feed: StreamId,
        outs: [StreamId; 2],
        water: &str,
        stages: StageSet,
    ) -> Self {
        Self {
            id: id.to_owned(),
            ins: [feed],
            outs,
            water: water.to_owned(),
            stages,
            v: 0.0,
            flash_coefficient: 0.02,
        }
    }

    /// Vapor fraction of the first effect.
    #[must_use]
    pub fn vapor_fraction(&self) -> f64 {
        self.v
    }

    /// Sets the vapor fraction of the first effect.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::Unit`] if `v` lies outside `[0, 1]`.
    pub fn set_vapor_fraction(&mut self, v: f64) -> Result<(), FlowsheetError> {
        if !(0.0..=1.0).contains(&v) {
            return Err(FlowsheetError::Unit {
                unit: self.id.clone(),
                reason: format!("vapor fraction {v} is outside [0, 1]"),
            });
        }
        self.v = v;
        Ok(())
    }

    /// Fraction of the liquid water evaporated in each active effect.
    fn effect_fractions(&self) -> Vec<f64> {
        if self.v <= 0.0 {
            return Vec::new();
        }
        let pressures = self.stages.pressures();
        let mut fractions = Vec::with_capacity(pressures.len());
        if !pressures.is_empty() {
            fractions.push(self.v);
        }
        for pair in pressures.windows(2) {
            let drop: Ratio = pair[1] / pair[0];
            let flash = self.flash_coefficient * (1.0 - drop.get::<ratio>());
            fractions.push((self.v + flash).clamp(0.0, 1.0));
        }
        fractions
    }
}

impl Unit for MultiEffectEvaporator {
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
        let water = feed.chemicals().index(&self.water)?;
        let temperature = feed.temperature();

        let mut concentrate = feed.mol().clone();
        let mut condensate = concentrate.clone();
        condensate.fill(0.0);

        for fraction in self.effect_fractions() {
            let vapor = concentrate[water] * fraction;
            concentrate[water] -= vapor;
            condensate[water] += vapor;
        }

        let [liquid, vapor] = self.outs;
        streams[liquid].set_mol(concentrate)?;
        streams[liquid].set_temperature(temperature);
        streams[vapor].set_mol(condensate)?;
        streams[vapor].set_temperature(temperature);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
