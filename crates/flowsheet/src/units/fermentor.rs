use std::any::Any;

use uom::si::{
    f64::{MassDensity, Power, Time},
    mass_density::kilogram_per_cubic_meter,
    power::kilowatt,
    time::hour,
};

use crate::{FlowsheetError, ParallelReaction, Phase, StreamId, Streams, Unit};

/// Continuous fermentor converting substrates with a parallel reaction set.
///
/// Outlets are `[vent, effluent]`; gaseous products leave through the vent.
/// The titer and productivity targets are set by specifications and fix the
/// residence time as `tau = titer / productivity`.
#[derive(Debug, Clone)]
pub struct Fermentor {
    id: String,
    ins: Vec<StreamId>,
    outs: [StreamId; 2],
    pub reactions: ParallelReaction,
    product: String,
    titer: MassDensity,
    /// Target productivity in g/L/hr.
    productivity: f64,
    tau: Time,
    /// Agitation power per m³ of working volume, in kW/m³.
    pub agitation_intensity: f64,
    /// Fraction of the vessel volume filled with broth.
    pub working_fraction: f64,
    power: Power,
}

impl Fermentor {
    #[must_use]
    pub fn new(
        id: &str,
        ins: Vec<StreamId>,
        outs: [StreamId; 2],
        reactions: ParallelReaction,
        product: &str,
    ) -> Self {
        Self {
            id: id.to_owned(),
            ins,
            outs,
            reactions,
            product: product.to_owned(),
            titer: MassDensity::new::<kilogram_per_cubic_meter>(100.0),
            productivity: 1.0,
            tau: Time::new::<hour>(100.0),
            agitation_intensity: 0.0,
            working_fraction: 0.8,
            power: Power::new::<kilowatt>(0.0),
        }
    }

    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    #[must_use]
    pub fn vent(&self) -> StreamId {
        self.outs[0]
    }

    #[must_use]
    pub fn effluent(&self) -> StreamId {
        self.outs[1]
    }

    /// Target titer (kg/m³, numerically equal to g/L).
    #[must_use]
    pub fn titer(&self) -> MassDensity {
        self.titer
    }

    pub fn set_titer(&mut self, titer: MassDensity) {
        self.titer = titer;
    }

    /// Target productivity in g/L/hr.
    #[must_use]
    pub fn productivity(&self) -> f64 {
        self.productivity
    }

    pub fn set_productivity(&mut self, productivity: f64) {
        self.productivity = productivity;
    }

    #[must_use]
    pub fn tau(&self) -> Time {
        self.tau
    }

    pub fn set_tau(&mut self, tau: Time) {
        self.tau = tau;
    }

    /// Sets `tau` from the current titer and productivity targets.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::Unit`] if productivity is not positive.
    pub fn update_tau(&mut self) -> Result<(), FlowsheetError> {
        if self.productivity.is_nan() || self.productivity <= 0.0 {
            return Err(FlowsheetError::Unit {
                unit: self.id.clone(),
                reason: format!("productivity {} must be positive", self.productivity),
            });
        }
        let titer = self.titer.get::<kilogram_per_cubic_meter>();
        self.tau = Time::new::<hour>(titer / self.productivity);
        Ok(())
    }
}

impl Unit for Fermentor {
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
        let [vent, effluent] = self.outs;
        streams.mix(&self.ins, effluent);

        let broth = &streams[effluent];
        let working_volume = broth.f_vol() * self.tau.get::<hour>();
        let mut mol = broth.mol().clone();
        let gases: Vec<bool> = broth
            .chemicals()
            .iter()
            .map(|c| c.phase == Phase::Gas)
            .collect();

        self.reactions.react(&mut mol)?;

        let mut off_gas = mol.clone();
        for (i, &gas) in gases.iter().enumerate() {
            if gas {
                mol[i] = 0.0;
            } else {
                off_gas[i] = 0.0;
            }
        }

        let temperature = streams[effluent].temperature();
        streams[effluent].set_mol(mol)?;
        streams[vent].set_mol(off_gas)?;
        streams[vent].set_temperature(temperature);

        self.power = Power::new::<kilowatt>(
            self.agitation_intensity * working_volume / self.working_fraction,
        );
        Ok(())
    }

    fn power(&self) -> Power {
        self.power
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
