#![allow(dead_code)]

use retort_flowsheet::{
    Chemical, Chemicals, Flowsheet, ParallelReaction, Reaction, StreamId, UnitId,
    units::{
        Fermentor, HeatExchanger, Mixer, MultiEffectEvaporator, StageEnd, StageSet, Splitter,
    },
};
use uom::si::{
    f64::{Pressure, ThermodynamicTemperature},
    pressure::kilopascal,
    thermodynamic_temperature::degree_celsius,
};

pub fn chemicals() -> Chemicals {
    Chemicals::new(vec![
        Chemical::liquid("Water", 18.015, 1000.0),
        Chemical::solid("Glucose", 180.156, 1540.0).with_carbon(6.0),
        Chemical::solid("Xylose", 150.13, 1525.0).with_carbon(5.0),
        Chemical::liquid("LacticAcid", 90.08, 1250.0).with_carbon(3.0),
        Chemical::liquid("AceticAcid", 60.05, 1049.0).with_carbon(2.0),
        Chemical::solid("Cellmass", 24.6, 1100.0).with_carbon(1.0),
        Chemical::gas("CO2", 44.0095).with_carbon(1.0),
        Chemical::liquid("Oil", 885.4, 920.0).with_carbon(57.0),
    ])
    .expect("unique ids")
}

pub fn effects(kpa: &[f64]) -> StageSet {
    StageSet::new(
        kpa.iter().map(|&p| Pressure::new::<kilopascal>(p)).collect(),
        StageEnd::Last,
    )
}

/// Broth at 80 g/L: 5000 kg/hr lactic acid in 58 500 kg/hr water, passed
/// through an optional dilution mixer and then an evaporator.
pub struct Concentrator {
    pub fs: Flowsheet,
    pub feed: StreamId,
    pub dilution: StreamId,
    pub syrup: StreamId,
    pub mixer: UnitId,
    pub evaporator: UnitId,
}

impl Concentrator {
    pub fn new(stages: &[f64]) -> Self {
        let mut fs = Flowsheet::new(chemicals());
        let feed = fs.add_stream("broth").expect("unique");
        let dilution = fs.add_stream("dilution_water").expect("unique");
        let mixed = fs.add_stream("diluted_broth").expect("unique");
        let syrup = fs.add_stream("syrup").expect("unique");
        let condensate = fs.add_stream("condensate").expect("unique");
        fs.stream_mut(feed).set_imass("LacticAcid", 5_000.0).expect("known");
        fs.stream_mut(feed).set_imass("Water", 58_500.0).expect("known");

        let mixer = fs
            .add_unit(Mixer::new("M201", vec![feed, dilution], mixed))
            .expect("unique");
        let evaporator = fs
            .add_unit(MultiEffectEvaporator::new(
                "E201",
                mixed,
                [syrup, condensate],
                "Water",
                effects(stages),
            ))
            .expect("unique");
        Self {
            fs,
            feed,
            dilution,
            syrup,
            mixer,
            evaporator,
        }
    }

    pub fn path(&self) -> Vec<UnitId> {
        vec![self.mixer, self.evaporator]
    }
}

/// Conversions `[X0..X5]`: glucose to lactic acid, acetic acid, and cell
/// mass, then the same three for xylose.
pub fn cofermentation(chemicals: &Chemicals, x: [f64; 6]) -> ParallelReaction {
    let c = chemicals;
    ParallelReaction::new(vec![
        rxn(c, "Glucose", &[("LacticAcid", 2.0)], x[0]),
        rxn(c, "Glucose", &[("AceticAcid", 3.0)], x[1]),
        rxn(c, "Glucose", &[("Cellmass", 6.0)], x[2]),
        rxn(c, "Xylose", &[("LacticAcid", 5.0 / 3.0)], x[3]),
        rxn(c, "Xylose", &[("AceticAcid", 2.5)], x[4]),
        rxn(c, "Xylose", &[("Cellmass", 5.0)], x[5]),
    ])
}

fn rxn(chemicals: &Chemicals, reactant: &str, products: &[(&str, f64)], x: f64) -> Reaction {
    Reaction::new(chemicals, reactant, products, x).expect("valid")
}

pub const BASE_CONVERSIONS: [f64; 6] = [0.76, 0.19, 0.05, 0.76, 0.19, 0.05];

/// Sugar feed concentrated by an evaporator, diluted, cooled, fermented,
/// and partly recycled to the evaporator feed:
///
/// ```text
/// sugars -> M301 -> E301 -> M302 -> H301 -> R301 -> S301 -> product
///            ^                                         |
///            +---------------- recycle ----------------+
/// ```
pub struct Biorefinery {
    pub fs: Flowsheet,
    pub sugars: StreamId,
    pub dilution: StreamId,
    pub feed: StreamId,
    pub broth: StreamId,
    pub recycle: StreamId,
    pub product: StreamId,
    pub evaporator: UnitId,
    pub dilution_mixer: UnitId,
    pub cooler: UnitId,
    pub fermentor: UnitId,
    pub seed: UnitId,
}

impl Biorefinery {
    pub fn new() -> Self {
        let chemicals = chemicals();
        let reactions = cofermentation(&chemicals, BASE_CONVERSIONS);
        let mut fs = Flowsheet::new(chemicals);

        let sugars = fs.add_stream("sugars").expect("unique");
        let recycle = fs.add_stream("recycle").expect("unique");
        let mixed = fs.add_stream("mixed_sugars").expect("unique");
        let syrup = fs.add_stream("syrup").expect("unique");
        let condensate = fs.add_stream("condensate").expect("unique");
        let dilution = fs.add_stream("dilution_water").expect("unique");
        let warm_feed = fs.add_stream("warm_feed").expect("unique");
        let feed = fs.add_stream("fermentor_feed").expect("unique");
        let vent = fs.add_stream("vent").expect("unique");
        let broth = fs.add_stream("broth").expect("unique");
        let product = fs.add_stream("product").expect("unique");
        let seed_feed = fs.add_stream("seed_feed").expect("unique");
        let seed_vent = fs.add_stream("seed_vent").expect("unique");
        let seed_broth = fs.add_stream("seed_broth").expect("unique");

        fs.stream_mut(sugars).set_imass("Glucose", 8_000.0).expect("known");
        fs.stream_mut(sugars).set_imass("Xylose", 2_000.0).expect("known");
        fs.stream_mut(sugars).set_imass("Water", 100_000.0).expect("known");
        fs.stream_mut(sugars).price = 0.1;
        fs.stream_mut(seed_feed).set_imass("Glucose", 100.0).expect("known");
        fs.stream_mut(seed_feed).set_imass("Water", 1_000.0).expect("known");

        fs.add_unit(Mixer::new("M301", vec![sugars, recycle], mixed))
            .expect("unique");
        let evaporator = fs
            .add_unit(MultiEffectEvaporator::new(
                "E301",
                mixed,
                [syrup, condensate],
                "Water",
                effects(&[101.325, 73.0, 50.0]),
            ))
            .expect("unique");
        let dilution_mixer = fs
            .add_unit(Mixer::new("M302", vec![syrup, dilution], warm_feed))
            .expect("unique");
        let cooler = fs
            .add_unit(HeatExchanger::new(
                "H301",
                warm_feed,
                feed,
                ThermodynamicTemperature::new::<degree_celsius>(37.0),
            ))
            .expect("unique");

        let seed_reactions = reactions.clone();
        let fermentor = fs
            .add_unit(Fermentor::new(
                "R301",
                vec![feed],
                [vent, broth],
                reactions,
                "LacticAcid",
            ))
            .expect("unique");
        let seed = fs
            .add_unit(Fermentor::new(
                "R302",
                vec![seed_feed],
                [seed_vent, seed_broth],
                seed_reactions,
                "LacticAcid",
            ))
            .expect("unique");

        let split = Splitter::fractions(fs.chemicals(), 0.05, &[]).expect("known");
        fs.add_unit(Splitter::new("S301", broth, [recycle, product], split))
            .expect("unique");

        Self {
            fs,
            sugars,
            dilution,
            feed,
            broth,
            recycle,
            product,
            evaporator,
            dilution_mixer,
            cooler,
            fermentor,
            seed,
        }
    }

    pub fn titer_path(&self) -> Vec<UnitId> {
        vec![self.evaporator, self.dilution_mixer, self.cooler, self.fermentor]
    }
}
