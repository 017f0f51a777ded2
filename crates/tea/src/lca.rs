use std::collections::HashMap;

use retort_flowsheet::{Flowsheet, Stream, StreamId};
use serde::Deserialize;
use uom::si::power::kilowatt;

use crate::TeaError;

/// Molar mass of CO2 in kg/kmol.
pub const CO2_MOLAR_MASS: f64 = 44.0095;

/// Characterization factors for global warming potential (GWP, kg CO2-eq)
/// and fossil energy consumption (FEC, MJ).
///
/// Chemical factors are per kg of chemical; electricity factors are per kWh.
/// Chemicals without a factor contribute nothing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CharacterizationFactors {
    pub gwp: HashMap<String, f64>,
    pub fec: HashMap<String, f64>,
    pub electricity_gwp: f64,
    pub electricity_fec: f64,
}

impl Default for CharacterizationFactors {
    fn default() -> Self {
        Self {
            gwp: HashMap::new(),
            fec: HashMap::new(),
            electricity_gwp: 0.48,
            electricity_fec: 5.926,
        }
    }
}

/// Per-kg-of-product environmental metrics of a converged flowsheet.
///
/// Material terms sum mass flows times factors over every priced feed and
/// every priced product other than the main one. GWP also counts fossil
/// carbon entering with the feeds as if burned to CO2. Both metrics add the
/// plant's net electricity demand times the grid factor.
#[derive(Debug, Clone)]
pub struct Lca {
    pub factors: CharacterizationFactors,
    product: StreamId,
}

impl Lca {
    #[must_use]
    pub fn new(factors: CharacterizationFactors, product: StreamId) -> Self {
        Self { factors, product }
    }

    /// Material GWP in kg CO2-eq per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn material_gwp(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        let total = self.material(flowsheet, &self.factors.gwp);
        Ok(total / self.product_mass(flowsheet)?)
    }

    /// GWP of fossil carbon combusted to CO2, per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn non_biogenic_gwp(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        let carbon: f64 = flowsheet
            .feeds()
            .map(|id| flowsheet.stream(id).fossil_carbon_flow())
            .sum();
        Ok(carbon * CO2_MOLAR_MASS / self.product_mass(flowsheet)?)
    }

    /// Electricity GWP per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn electricity_gwp(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        Ok(electricity(flowsheet) * self.factors.electricity_gwp / self.product_mass(flowsheet)?)
    }

    /// Carbon bound in the product, as kg CO2 per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn fixed_gwp(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        let carbon = flowsheet.stream(self.product).carbon_flow();
        Ok(carbon * CO2_MOLAR_MASS / self.product_mass(flowsheet)?)
    }

    /// Total GWP in kg CO2-eq per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn gwp(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        Ok(self.material_gwp(flowsheet)?
            + self.non_biogenic_gwp(flowsheet)?
            + self.electricity_gwp(flowsheet)?)
    }

    /// Total FEC in MJ per kg product.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if the product has no mass.
    pub fn fec(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        let mass = self.product_mass(flowsheet)?;
        let material = self.material(flowsheet, &self.factors.fec);
        Ok((material + electricity(flowsheet) * self.factors.electricity_fec) / mass)
    }

    fn product_mass(&self, flowsheet: &Flowsheet) -> Result<f64, TeaError> {
        let stream = flowsheet.stream(self.product);
        let mass = stream.f_mass();
        if mass > 0.0 {
            Ok(mass)
        } else {
            Err(TeaError::ZeroProductFlow(stream.id().to_owned()))
        }
    }

    fn material(&self, flowsheet: &Flowsheet, factors: &HashMap<String, f64>) -> f64 {
        let priced = |id: &StreamId| flowsheet.stream(*id).price != 0.0;
        flowsheet
            .feeds()
            .chain(flowsheet.products().filter(|&id| id != self.product))
            .filter(priced)
            .map(|id| impact(flowsheet.stream(id), factors))
            .sum()
    }
}

/// Sum of chemical mass flows times their factors.
fn impact(stream: &Stream, factors: &HashMap<String, f64>) -> f64 {
    stream
        .chemicals()
        .iter()
        .zip(stream.mass())
        .map(|(chemical, mass)| mass * factors.get(&chemical.id).copied().unwrap_or(0.0))
        .sum()
}

/// Net plant electricity demand in kW (kWh/hr).
fn electricity(flowsheet: &Flowsheet) -> f64 {
    flowsheet.power().get::<kilowatt>()
}
