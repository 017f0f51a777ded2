use ndarray::Array1;

use crate::{Chemicals, FlowsheetError, ReactionError};

/// Conversion of a single reactant into products.
///
/// Stoichiometry is normalized to one kmol of reactant consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    reactant: usize,
    reactant_id: String,
    stoichiometry: Array1<f64>,
    conversion: f64,
}

impl Reaction {
    /// Creates a reaction `reactant -> Σ coefficient · product`.
    ///
    /// # Errors
    ///
    /// Returns an error if a chemical is unknown or `conversion` lies
    /// outside `[0, 1]`.
    pub fn new(
        chemicals: &Chemicals,
        reactant: &str,
        products: &[(&str, f64)],
        conversion: f64,
    ) -> Result<Self, FlowsheetError> {
        let index = chemicals.index(reactant)?;
        let mut stoichiometry = Array1::zeros(chemicals.len());
        stoichiometry[index] = -1.0;
        for &(product, coefficient) in products {
            stoichiometry[chemicals.index(product)?] += coefficient;
        }
        check_conversion(0, conversion)?;
        Ok(Self {
            reactant: index,
            reactant_id: reactant.to_owned(),
            stoichiometry,
            conversion,
        })
    }

    #[must_use]
    pub fn reactant(&self) -> &str {
        &self.reactant_id
    }

    #[must_use]
    pub fn conversion(&self) -> f64 {
        self.conversion
    }
}

/// Reactions that draw on the inlet amounts simultaneously.
///
/// Conversions are indexable and settable one by one, so specifications can
/// rewrite individual entries (the yield of a product, the share of a
/// byproduct) without rebuilding the set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelReaction {
    reactions: Vec<Reaction>,
}

impl ParallelReaction {
    #[must_use]
    pub fn new(reactions: Vec<Reaction>) -> Self {
        Self { reactions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.iter()
    }

    /// Returns the conversion of reaction `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::Index`] if `index` is out of range.
    pub fn conversion(&self, index: usize) -> Result<f64, ReactionError> {
        self.get(index).map(|reaction| reaction.conversion)
    }

    /// Sets the conversion of reaction `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or `value` lies outside `[0, 1]`.
    pub fn set_conversion(&mut self, index: usize, value: f64) -> Result<(), ReactionError> {
        check_conversion(index, value)?;
        let len = self.reactions.len();
        let reaction = self
            .reactions
            .get_mut(index)
            .ok_or(ReactionError::Index { index, len })?;
        reaction.conversion = value;
        Ok(())
    }

    /// All conversions in reaction order.
    #[must_use]
    pub fn conversions(&self) -> Array1<f64> {
        self.reactions.iter().map(|r| r.conversion).collect()
    }

    /// Applies every reaction to `mol` after checking that no reactant is
    /// consumed beyond its inlet amount.
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::Overconversion`] if the conversions of one
    /// reactant sum to more than 1.
    pub fn react(&self, mol: &mut Array1<f64>) -> Result<(), ReactionError> {
        let mut totals: Vec<(usize, f64)> = Vec::new();
        for reaction in &self.reactions {
            match totals.iter_mut().find(|(i, _)| *i == reaction.reactant) {
                Some((_, total)) => *total += reaction.conversion,
                None => totals.push((reaction.reactant, reaction.conversion)),
            }
        }
        if let Some((i, total)) = totals.into_iter().find(|&(_, total)| total > 1.0 + 1e-12) {
            let reactant = self
                .reactions
                .iter()
                .find(|r| r.reactant == i)
                .map(|r| r.reactant_id.clone())
                .unwrap_or_default();
            return Err(ReactionError::Overconversion { reactant, total });
        }
        self.force_reaction(mol);
        Ok(())
    }

    /// Applies every reaction to `mol` without validating conversions.
    pub fn force_reaction(&self, mol: &mut Array1<f64>) {
        let inlet = mol.clone();
        for reaction in &self.reactions {
            let extent = reaction.conversion * inlet[reaction.reactant];
            mol.scaled_add(extent, &reaction.stoichiometry);
        }
    }

    fn get(&self, index: usize) -> Result<&Reaction, ReactionError> {
        self.reactions.get(index).ok_or(ReactionError::Index {
            index,
            len: self.reactions.len(),
        })
    }
}

fn check_conversion(index: usize, value: f64) -> Result<(), ReactionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ReactionError::Conversion { index, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::Chemical;

    fn chemicals() -> Chemicals {
        Chemicals::new(vec![
            Chemical::solid("Glucose", 180.156, 1540.0).with_carbon(6.0),
            Chemical::liquid("LacticAcid", 90.08, 1250.0).with_carbon(3.0),
            Chemical::liquid("AceticAcid", 60.05, 1049.0).with_carbon(2.0),
            Chemical::gas("CO2", 44.0095).with_carbon(1.0),
        ])
        .expect("unique ids")
    }

    fn fermentation(chemicals: &Chemicals, x: [f64; 2]) -> ParallelReaction {
        ParallelReaction::new(vec![
            Reaction::new(chemicals, "Glucose", &[("LacticAcid", 2.0)], x[0]).expect("valid"),
            Reaction::new(
                chemicals,
                "Glucose",
                &[("AceticAcid", 2.0), ("CO2", 2.0)],
                x[1],
            )
            .expect("valid"),
        ])
    }

    #[test]
    fn parallel_reactions_share_inlet_amount() {
        let chemicals = chemicals();
        let rxns = fermentation(&chemicals, [0.8, 0.1]);
        let mut mol = Array1::from(vec![10.0, 0.0, 0.0, 0.0]);

        rxns.react(&mut mol).expect("feasible");

        assert_relative_eq!(mol[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(mol[1], 16.0, epsilon = 1e-12);
        assert_relative_eq!(mol[2], 2.0, epsilon = 1e-12);
        assert_relative_eq!(mol[3], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn react_rejects_overconversion() {
        let chemicals = chemicals();
        let rxns = fermentation(&chemicals, [0.8, 0.3]);
        let mut mol = Array1::from(vec![10.0, 0.0, 0.0, 0.0]);

        let result = rxns.react(&mut mol);
        assert!(matches!(
            result,
            Err(ReactionError::Overconversion { ref reactant, .. }) if reactant == "Glucose"
        ));
        // Nothing was applied.
        assert_relative_eq!(mol[0], 10.0);
    }

    #[test]
    fn force_reaction_skips_validation() {
        let chemicals = chemicals();
        let rxns = fermentation(&chemicals, [0.8, 0.3]);
        let mut mol = Array1::from(vec![10.0, 0.0, 0.0, 0.0]);

        rxns.force_reaction(&mut mol);
        assert_relative_eq!(mol[0], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn conversions_are_settable_by_index() {
        let chemicals = chemicals();
        let mut rxns = fermentation(&chemicals, [0.8, 0.1]);

        rxns.set_conversion(1, 0.05).expect("in range");
        assert_relative_eq!(rxns.conversion(1).expect("in range"), 0.05);
        assert!(matches!(
            rxns.set_conversion(2, 0.1),
            Err(ReactionError::Index { index: 2, len: 2 })
        ));
        assert!(matches!(
            rxns.set_conversion(0, 1.5),
            Err(ReactionError::Conversion { .. })
        ));
    }
}
