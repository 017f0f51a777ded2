use std::{
    collections::HashMap,
    fmt,
    ops::{Index, IndexMut},
    sync::Arc,
};

use ndarray::Array1;
use uom::si::{
    f64::{Mass, MassRate, ThermodynamicTemperature, Time, Volume, VolumeRate},
    mass::kilogram,
    thermodynamic_temperature::kelvin,
    time::hour,
    volume::cubic_meter,
};

use crate::{Chemicals, FlowsheetError};

/// Handle to a stream owned by a [`Flowsheet`](crate::Flowsheet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) usize);

/// A material stream: molar flows by chemical plus temperature and price.
///
/// Flows are stored in kmol/hr aligned with the shared [`Chemicals`]
/// registry. Mass flows are in kg/hr and volumetric flows in m³/hr; the
/// `*_rate` accessors return the same quantities as `uom` values.
#[derive(Debug, Clone)]
pub struct Stream {
    id: String,
    chemicals: Arc<Chemicals>,
    mol: Array1<f64>,
    temperature: ThermodynamicTemperature,
    /// Price in USD/kg; positive for purchased feeds and sold products.
    pub price: f64,
}

impl Stream {
    /// Creates an empty stream at 298.15 K.
    #[must_use]
    pub fn new(id: &str, chemicals: Arc<Chemicals>) -> Self {
        let mol = Array1::zeros(chemicals.len());
        Self {
            id: id.to_owned(),
            chemicals,
            mol,
            temperature: ThermodynamicTemperature::new::<kelvin>(298.15),
            price: 0.0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn chemicals(&self) -> &Chemicals {
        &self.chemicals
    }

    /// Molar flows in kmol/hr.
    #[must_use]
    pub fn mol(&self) -> &Array1<f64> {
        &self.mol
    }

    /// Replaces every molar flow.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::Unit`] if `mol` does not match the registry size.
    pub fn set_mol(&mut self, mol: Array1<f64>) -> Result<(), FlowsheetError> {
        if mol.len() != self.mol.len() {
            return Err(FlowsheetError::Unit {
                unit: self.id.clone(),
                reason: format!("expected {} flows, got {}", self.mol.len(), mol.len()),
            });
        }
        self.mol = mol;
        Ok(())
    }

    /// Molar flow of one chemical in kmol/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if `chemical` is not registered.
    pub fn imol(&self, chemical: &str) -> Result<f64, FlowsheetError> {
        Ok(self.mol[self.chemicals.index(chemical)?])
    }

    /// Sets the molar flow of one chemical in kmol/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if `chemical` is not registered.
    pub fn set_imol(&mut self, chemical: &str, value: f64) -> Result<(), FlowsheetError> {
        let i = self.chemicals.index(chemical)?;
        self.mol[i] = value;
        Ok(())
    }

    /// Mass flow of one chemical in kg/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if `chemical` is not registered.
    pub fn imass(&self, chemical: &str) -> Result<f64, FlowsheetError> {
        let i = self.chemicals.index(chemical)?;
        Ok(self.mol[i] * self.chemicals[i].molar_mass)
    }

    /// Sets the mass flow of one chemical in kg/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if `chemical` is not registered.
    pub fn set_imass(&mut self, chemical: &str, value: f64) -> Result<(), FlowsheetError> {
        let i = self.chemicals.index(chemical)?;
        self.mol[i] = value / self.chemicals[i].molar_mass;
        Ok(())
    }

    /// Summed mass flow of several chemicals in kg/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] for the first unknown id.
    pub fn imass_sum<S: AsRef<str>>(&self, chemicals: &[S]) -> Result<f64, FlowsheetError> {
        chemicals
            .iter()
            .map(|id| self.imass(id.as_ref()))
            .sum()
    }

    /// Mass flows in kg/hr.
    #[must_use]
    pub fn mass(&self) -> Array1<f64> {
        &self.mol * self.chemicals.molar_masses()
    }

    /// Total mass flow in kg/hr.
    #[must_use]
    pub fn f_mass(&self) -> f64 {
        self.mol.dot(self.chemicals.molar_masses())
    }

    /// Total molar flow in kmol/hr.
    #[must_use]
    pub fn f_mol(&self) -> f64 {
        self.mol.sum()
    }

    /// Condensed-phase volumetric flow in m³/hr.
    ///
    /// Gases carry no density and do not contribute.
    #[must_use]
    pub fn f_vol(&self) -> f64 {
        self.chemicals
            .iter()
            .zip(self.mol.iter())
            .filter_map(|(chemical, &mol)| {
                chemical
                    .density
                    .map(|rho| mol * chemical.molar_mass / rho)
            })
            .sum()
    }

    /// Volumetric flow of several chemicals in m³/hr.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] for the first unknown id.
    pub fn ivol_sum<S: AsRef<str>>(&self, chemicals: &[S]) -> Result<f64, FlowsheetError> {
        let mut total = 0.0;
        for id in chemicals {
            let i = self.chemicals.index(id.as_ref())?;
            let chemical = &self.chemicals[i];
            if let Some(rho) = chemical.density {
                total += self.mol[i] * chemical.molar_mass / rho;
            }
        }
        Ok(total)
    }

    #[must_use]
    pub fn mass_rate(&self) -> MassRate {
        Mass::new::<kilogram>(self.f_mass()) / Time::new::<hour>(1.0)
    }

    #[must_use]
    pub fn volume_rate(&self) -> VolumeRate {
        Volume::new::<cubic_meter>(self.f_vol()) / Time::new::<hour>(1.0)
    }

    #[must_use]
    pub fn temperature(&self) -> ThermodynamicTemperature {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: ThermodynamicTemperature) {
        self.temperature = temperature;
    }

    /// Carbon flow in kmol C/hr.
    #[must_use]
    pub fn carbon_flow(&self) -> f64 {
        self.carbon_flow_where(|_| true)
    }

    /// Carbon flow from fossil-derived chemicals in kmol C/hr.
    #[must_use]
    pub fn fossil_carbon_flow(&self) -> f64 {
        self.carbon_flow_where(|fossil| fossil)
    }

    /// Purchase or sale value in USD/hr.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.price * self.f_mass()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mol.iter().all(|&m| m == 0.0)
    }

    /// Zeros every flow.
    pub fn empty(&mut self) {
        self.mol.fill(0.0);
    }

    /// Copies flows and temperature from `other`, keeping id and price.
    pub fn copy_like(&mut self, other: &Stream) {
        self.mol.assign(&other.mol);
        self.temperature = other.temperature;
    }

    fn carbon_flow_where(&self, keep: impl Fn(bool) -> bool) -> f64 {
        self.chemicals
            .iter()
            .zip(self.mol.iter())
            .filter(|(chemical, _)| keep(chemical.fossil))
            .map(|(chemical, &mol)| chemical.carbon_atoms * mol)
            .sum()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.3} kg/hr at {:.2} K",
            self.id,
            self.f_mass(),
            self.temperature.get::<kelvin>()
        )
    }
}

/// Stream storage addressed by [`StreamId`].
#[derive(Debug, Default)]
pub struct Streams {
    items: Vec<Stream>,
    names: HashMap<String, StreamId>,
}

impl Streams {
    pub(crate) fn insert(&mut self, stream: Stream) -> Result<StreamId, FlowsheetError> {
        if self.names.contains_key(stream.id()) {
            return Err(FlowsheetError::DuplicateStream(stream.id().to_owned()));
        }
        let id = StreamId(self.items.len());
        self.names.insert(stream.id().to_owned(), id);
        self.items.push(stream);
        Ok(id)
    }

    /// Looks up a stream handle by name.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownStream`] if no stream has that name.
    pub fn id(&self, name: &str) -> Result<StreamId, FlowsheetError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| FlowsheetError::UnknownStream(name.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StreamId, &Stream)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, stream)| (StreamId(i), stream))
    }

    /// Writes the sum of `ins` into `out`.
    ///
    /// The outlet temperature is the mass-weighted mean of the inlets.
    pub fn mix(&mut self, ins: &[StreamId], out: StreamId) {
        let mut mol = Array1::zeros(self[out].mol.len());
        let mut mass = 0.0;
        let mut weighted_t = 0.0;
        for &id in ins {
            let stream = &self[id];
            mol += &stream.mol;
            let m = stream.f_mass();
            mass += m;
            weighted_t += m * stream.temperature.get::<kelvin>();
        }
        let outlet = &mut self[out];
        outlet.mol = mol;
        if mass > 0.0 {
            outlet.temperature = ThermodynamicTemperature::new::<kelvin>(weighted_t / mass);
        }
    }

    /// Copies flows and temperature of `from` into `to`.
    pub fn copy(&mut self, from: StreamId, to: StreamId) {
        let source = self[from].clone();
        self[to].copy_like(&source);
    }
}

impl Index<StreamId> for Streams {
    type Output = Stream;

    fn index(&self, id: StreamId) -> &Stream {
        &self.items[id.0]
    }
}

impl IndexMut<StreamId> for Streams {
    fn index_mut(&mut self, id: StreamId) -> &mut Stream {
        &mut self.items[id.0]
    }
}
