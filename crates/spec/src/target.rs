use retort_flowsheet::{Flowsheet, FlowsheetError, StreamId, Unit, UnitId, units::Fermentor};
use uom::si::mass_density::kilogram_per_cubic_meter;

/// Ratio substituted when a target's denominator vanishes.
///
/// Large enough to dominate any physical titer or content, so a search that
/// hits a dry stream is pushed away from it instead of seeing NaN.
pub const DEGENERATE_RATIO: f64 = 1e12;

const MIN_DENOMINATOR: f64 = 1e-12;

/// Divides `numerator` by `denominator`, returning [`DEGENERATE_RATIO`]
/// when the denominator is near zero or the result is not finite.
#[must_use]
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < MIN_DENOMINATOR {
        return DEGENERATE_RATIO;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { DEGENERATE_RATIO }
}

/// A quantity observed on freshly run streams.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Product mass per condensed volume in g/L, excluding the volume of
    /// `ignored` chemicals.
    ///
    /// Product already carried in by `inlets` (a recycle back to the
    /// fermentor, for instance) is not counted as made.
    Titer {
        stream: StreamId,
        products: Vec<String>,
        ignored: Vec<String>,
        inlets: Vec<StreamId>,
    },
    /// Oil per oil-plus-water mass, in g/kg.
    OilContent {
        stream: StreamId,
        oils: Vec<String>,
        water: String,
    },
    /// Product mass over the theoretical maximum from substrates.
    ///
    /// `substrates` pairs each substrate with its theoretical product mass
    /// per unit substrate mass.
    Yield {
        product_stream: StreamId,
        product: String,
        substrate_stream: StreamId,
        substrates: Vec<(String, f64)>,
    },
}

impl Target {
    #[must_use]
    pub fn titer(stream: StreamId, product: &str) -> Self {
        Self::Titer {
            stream,
            products: vec![product.to_owned()],
            ignored: Vec::new(),
            inlets: Vec::new(),
        }
    }

    /// Titer of a fermentor's effluent net of the product in its inlets.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnitType`] if `fermentor` is not a [`Fermentor`].
    pub fn fermentor_titer(
        flowsheet: &Flowsheet,
        fermentor: UnitId,
    ) -> Result<Self, FlowsheetError> {
        let unit = flowsheet.unit::<Fermentor>(fermentor)?;
        Ok(Self::Titer {
            stream: unit.effluent(),
            products: vec![unit.product().to_owned()],
            ignored: Vec::new(),
            inlets: unit.ins().to_vec(),
        })
    }

    /// Computes the current value from the flowsheet's streams.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if a chemical is not registered.
    pub fn observe(&self, flowsheet: &Flowsheet) -> Result<f64, FlowsheetError> {
        match self {
            Target::Titer {
                stream, ignored, ..
            } => {
                let product = self.product_mass(flowsheet)?.unwrap_or_default();
                let stream = flowsheet.stream(*stream);
                let volume = stream.f_vol() - stream.ivol_sum(ignored)?;
                Ok(guarded_ratio(product, volume))
            }
            Target::OilContent {
                stream,
                oils,
                water,
            } => {
                let stream = flowsheet.stream(*stream);
                let oil = stream.imass_sum(oils)?;
                let water = stream.imass(water)?;
                Ok(1000.0 * guarded_ratio(oil, oil + water))
            }
            Target::Yield {
                product_stream,
                product,
                substrate_stream,
                substrates,
            } => {
                let made = flowsheet.stream(*product_stream).imass(product)?;
                let feed = flowsheet.stream(*substrate_stream);
                let mut theoretical = 0.0;
                for (substrate, factor) in substrates {
                    theoretical += feed.imass(substrate)? * factor;
                }
                Ok(guarded_ratio(made, theoretical))
            }
        }
    }

    /// Product mass flow made in kg/hr for titer targets, net of the
    /// product in the inlets.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnknownChemical`] if a chemical is not registered.
    pub fn product_mass(&self, flowsheet: &Flowsheet) -> Result<Option<f64>, FlowsheetError> {
        match self {
            Target::Titer {
                stream,
                products,
                inlets,
                ..
            } => {
                let mut made = flowsheet.stream(*stream).imass_sum(products)?;
                for &inlet in inlets {
                    made -= flowsheet.stream(inlet).imass_sum(products)?;
                }
                Ok(Some(made))
            }
            _ => Ok(None),
        }
    }
}

/// Where a specification reads its target value from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    Fixed(f64),
    /// The titer target of a [`Fermentor`], in g/L.
    FermentorTiter(UnitId),
}

impl Setpoint {
    /// Returns the current target value.
    ///
    /// # Errors
    ///
    /// Returns [`FlowsheetError::UnitType`] if the unit is not a fermentor.
    pub fn value(self, flowsheet: &Flowsheet) -> Result<f64, FlowsheetError> {
        match self {
            Setpoint::Fixed(value) => Ok(value),
            Setpoint::FermentorTiter(unit) => Ok(flowsheet
                .unit::<Fermentor>(unit)?
                .titer()
                .get::<kilogram_per_cubic_meter>()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use retort_flowsheet::{Chemical, Chemicals};

    fn broth() -> (Flowsheet, StreamId) {
        let mut fs = Flowsheet::new(
            Chemicals::new(vec![
                Chemical::liquid("Water", 18.015, 1000.0),
                Chemical::liquid("Product", 90.08, 1250.0),
                Chemical::liquid("Oil", 885.4, 920.0),
                Chemical::solid("Glucose", 180.156, 1540.0),
            ])
            .expect("unique ids"),
        );
        let stream = fs.add_stream("broth").expect("unique");
        (fs, stream)
    }

    #[test]
    fn titer_excludes_ignored_volume() {
        let (mut fs, s) = broth();
        fs.stream_mut(s).set_imass("Water", 58_500.0).expect("known");
        fs.stream_mut(s).set_imass("Product", 5_000.0).expect("known");
        fs.stream_mut(s).set_imass("Oil", 920.0).expect("known");

        let plain = Target::titer(s, "Product");
        let ignoring = Target::Titer {
            stream: s,
            products: vec!["Product".into()],
            ignored: vec!["Oil".into()],
            inlets: Vec::new(),
        };

        assert_relative_eq!(plain.observe(&fs).expect("known"), 5_000.0 / 63.5, epsilon = 1e-9);
        assert_relative_eq!(ignoring.observe(&fs).expect("known"), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn titer_discounts_product_carried_in_by_inlets() {
        let (mut fs, s) = broth();
        let fresh = fs.add_stream("fresh").expect("unique");
        let recycled = fs.add_stream("recycled").expect("unique");
        fs.stream_mut(s).set_imass("Water", 50_000.0).expect("known");
        fs.stream_mut(s).set_imass("Product", 5_000.0).expect("known");
        fs.stream_mut(fresh).set_imass("Water", 40_000.0).expect("known");
        fs.stream_mut(recycled).set_imass("Product", 1_000.0).expect("known");

        let target = Target::Titer {
            stream: s,
            products: vec!["Product".into()],
            ignored: Vec::new(),
            inlets: vec![fresh, recycled],
        };

        assert_relative_eq!(
            target.product_mass(&fs).expect("known").expect("titer"),
            4_000.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(target.observe(&fs).expect("known"), 4_000.0 / 54.0, epsilon = 1e-9);
    }

    #[test]
    fn oil_content_is_per_mille() {
        let (mut fs, s) = broth();
        fs.stream_mut(s).set_imass("Water", 900.0).expect("known");
        fs.stream_mut(s).set_imass("Oil", 100.0).expect("known");

        let target = Target::OilContent {
            stream: s,
            oils: vec!["Oil".into()],
            water: "Water".into(),
        };
        assert_relative_eq!(target.observe(&fs).expect("known"), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn yield_uses_theoretical_factors() {
        let (mut fs, s) = broth();
        let feed = fs.add_stream("feed").expect("unique");
        fs.stream_mut(feed).set_imass("Glucose", 1000.0).expect("known");
        fs.stream_mut(s).set_imass("Product", 800.0).expect("known");

        let target = Target::Yield {
            product_stream: s,
            product: "Product".into(),
            substrate_stream: feed,
            substrates: vec![("Glucose".into(), 1.0)],
        };
        assert_relative_eq!(target.observe(&fs).expect("known"), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn empty_stream_gives_sentinel_not_nan() {
        let (fs, s) = broth();
        let value = Target::titer(s, "Product").observe(&fs).expect("known");
        assert!(value.is_finite());
        assert_relative_eq!(value, DEGENERATE_RATIO);
    }
}
