use std::collections::HashMap;

use ndarray::Array1;
use serde::Deserialize;

use crate::FlowsheetError;

/// Phase a chemical is assumed to occupy at process conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Liquid,
    Solid,
    Gas,
}

/// A chemical species with the properties mass balances need.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chemical {
    pub id: String,
    /// Molar mass in kg/kmol.
    pub molar_mass: f64,
    /// Condensed-phase density in kg/m³; `None` for gases.
    #[serde(default)]
    pub density: Option<f64>,
    /// Carbon atoms per molecule.
    #[serde(default)]
    pub carbon_atoms: f64,
    /// Carbon of fossil origin counts toward non-biogenic emissions.
    #[serde(default)]
    pub fossil: bool,
    pub phase: Phase,
}

impl Chemical {
    #[must_use]
    pub fn liquid(id: &str, molar_mass: f64, density: f64) -> Self {
        Self::condensed(id, molar_mass, density, Phase::Liquid)
    }

    #[must_use]
    pub fn solid(id: &str, molar_mass: f64, density: f64) -> Self {
        Self::condensed(id, molar_mass, density, Phase::Solid)
    }

    #[must_use]
    pub fn gas(id: &str, molar_mass: f64) -> Self {
        Self {
            id: id.to_owned(),
            molar_mass,
            density: None,
            carbon_atoms: 0.0,
            fossil: false,
            phase: Phase::Gas,
        }
    }

    /// Sets the number of carbon atoms per molecule.
    #[must_use]
    pub fn with_carbon(mut self, atoms: f64) -> Self {
        self.carbon_atoms = atoms;
        self
    }

    /// Marks the chemical's carbon as fossil-derived.
    #[must_use]
    pub fn fossil(mut self) -> Self {
        self.fossil = true;
        self
    }

    fn condensed(id: &str, molar_mass: f64, density: f64, phase: Phase) -> Self {
        Self {
            id: id.to_owned(),
            molar_mass,
            density: Some(density),
            carbon_atoms: 0.0,
            fossil: false,
            phase,
        }
    }
}

/// An indexed registry of chemicals shared by every stream of a flowsheet.
#[derive(Debug, Clone)]
pub struct Chemicals {
    list: Vec<Chemical>,
    index: HashMap<String, usize>,
    molar_masses: Array1<f64>,
}

impl Chemicals {
    /// Builds a registry, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::DuplicateChemical`] if an id repeats.
    pub fn new(list: Vec<Chemical>) -> Result<Self, FlowsheetError> {
        let mut index = HashMap::with_capacity(list.len());
        for (i, chemical) in list.iter().enumerate() {
            if index.insert(chemical.id.clone(), i).is_some() {
                return Err(FlowsheetError::DuplicateChemical(chemical.id.clone()));
            }
        }
        let molar_masses = list.iter().map(|c| c.molar_mass).collect();
        Ok(Self {
            list,
            index,
            molar_masses,
        })
    }

    /// Returns the position of `id` in flow arrays.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if `id` is not registered.
    pub fn index(&self, id: &str) -> Result<usize, FlowsheetError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| FlowsheetError::UnknownChemical(id.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chemical> {
        self.list.iter()
    }

    /// Molar masses in kg/kmol, aligned with flow arrays.
    #[must_use]
    pub fn molar_masses(&self) -> &Array1<f64> {
        &self.molar_masses
    }
}

impl std::ops::Index<usize> for Chemicals {
    type Output = Chemical;

    fn index(&self, index: usize) -> &Chemical {
        &self.list[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn indexes_by_id() {
        let chemicals = Chemicals::new(vec![
            Chemical::liquid("Water", 18.015, 997.0),
            Chemical::gas("CO2", 44.0095).with_carbon(1.0),
        ])
        .expect("unique ids");

        assert_eq!(chemicals.index("CO2").expect("registered"), 1);
        assert_relative_eq!(chemicals[1].carbon_atoms, 1.0);
        assert!(matches!(
            chemicals.index("Ethanol"),
            Err(FlowsheetError::UnknownChemical(id)) if id == "Ethanol"
        ));
    }

    #[test]
    fn rejects_duplicates() {
        let result = Chemicals::new(vec![
            Chemical::liquid("Water", 18.015, 997.0),
            Chemical::liquid("Water", 18.015, 997.0),
        ]);
        assert!(matches!(result, Err(FlowsheetError::DuplicateChemical(_))));
    }
}
