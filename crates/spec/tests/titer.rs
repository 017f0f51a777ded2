mod common;

use approx::assert_relative_eq;
use common::Concentrator;
use retort_flowsheet::{
    Chemical, Chemicals, Flowsheet,
    units::{Mixer, MultiEffectEvaporator},
};
use retort_spec::{
    DesignVariable, Resolution, Setpoint, Settings, SpecError, Specification, Target,
};

fn titer_spec(plant: &Concentrator, goal: f64) -> Specification {
    Specification::new(
        "titer",
        DesignVariable::vapor_fraction(plant.evaporator),
        Target::titer(plant.syrup, "LacticAcid"),
        Setpoint::Fixed(goal),
        plant.path(),
    )
}

fn stages(plant: &Concentrator) -> usize {
    plant
        .fs
        .unit::<MultiEffectEvaporator>(plant.evaporator)
        .expect("evaporator")
        .stages
        .len()
}

#[test]
fn concentrates_80_to_97_5_grams_per_liter() {
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 97.5);

    let x = match spec.resolve(&mut plant.fs).expect("feasible") {
        Resolution::Solved { x, .. } | Resolution::Met { x } => x,
        other => panic!("expected a root, got {other:?}"),
    };

    // 5000 / (58.5 (1 - x) + 4) = 97.5
    let expected = 1.0 - (5_000.0 / 97.5 - 4.0) / 58.5;
    assert!(x > 0.0 && x < 0.9);
    assert_relative_eq!(x, expected, epsilon = 1e-5);

    let titer = spec.target.observe(&plant.fs).expect("known");
    assert!((titer - 97.5).abs() <= 1e-4, "titer {titer}");
    assert_eq!(spec.variable.last(), Some(x));
}

#[test]
fn warm_start_needs_no_more_iterations() {
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 97.5);

    let Resolution::Solved { x: first_x, iters: first } =
        spec.resolve(&mut plant.fs).expect("feasible")
    else {
        panic!("expected root finding");
    };
    let Resolution::Solved { x: second_x, iters: second } =
        spec.resolve(&mut plant.fs).expect("feasible")
    else {
        panic!("expected root finding");
    };

    assert!(second <= first, "{second} > {first}");
    assert_relative_eq!(first_x, second_x, epsilon = 1e-5);
}

#[test]
fn trims_effects_while_minimal_evaporation_overshoots() {
    // With three effects even a vanishing vapor fraction flashes enough
    // water to exceed 80.3 g/L; with one effect it does not.
    let mut plant = Concentrator::new(&[101.325, 70.0, 40.0]);
    let mut spec = titer_spec(&plant, 80.3);

    let resolution = spec.resolve(&mut plant.fs).expect("feasible");

    assert!(matches!(resolution, Resolution::Solved { .. }));
    assert_eq!(stages(&plant), 1);
    let titer = spec.target.observe(&plant.fs).expect("known");
    assert!((titer - 80.3).abs() <= 1e-4, "titer {titer}");
}

#[test]
fn stages_are_restored_before_each_resolve() {
    let mut plant = Concentrator::new(&[101.325, 70.0, 40.0]);
    titer_spec(&plant, 80.3).resolve(&mut plant.fs).expect("feasible");
    assert_eq!(stages(&plant), 1);

    titer_spec(&plant, 150.0).resolve(&mut plant.fs).expect("feasible");
    assert_eq!(stages(&plant), 3);
}

#[test]
fn exhausting_every_effect_is_infeasible() {
    let mut plant = Concentrator::new(&[101.325, 70.0, 40.0]);
    let mut spec = titer_spec(&plant, 2_000.0);

    match spec.resolve(&mut plant.fs) {
        Err(SpecError::Infeasible {
            spec,
            bracket,
            residuals,
            stages,
        }) => {
            assert_eq!(spec, "titer");
            assert_eq!(bracket, [0.0, 0.9]);
            assert!(residuals.iter().all(|&r| r > 0.0));
            assert_eq!(stages, 1);
        }
        other => panic!("expected infeasible, got {other:?}"),
    }
    assert_eq!(spec.variable.last(), None);
}

#[test]
fn overshoot_at_minimal_processing_dilutes_in_closed_form() {
    let mut plant = Concentrator::new(&[101.325, 70.0]);
    let mut spec = titer_spec(&plant, 60.0).with_dilution(plant.dilution, "Water");

    let resolution = spec.resolve(&mut plant.fs).expect("feasible");

    // (1/60 - 1/80) m³/kg * 5000 kg/hr * 1000 kg/m³
    let Resolution::Diluted { water } = resolution else {
        panic!("expected dilution, got {resolution:?}");
    };
    assert_relative_eq!(water, 20_833.333_333, epsilon = 1e-3);
    assert_relative_eq!(
        plant.fs.stream(plant.dilution).imass("Water").expect("known"),
        water
    );

    let titer = spec.target.observe(&plant.fs).expect("known");
    assert_relative_eq!(titer, 60.0, epsilon = 1e-9);
    let evaporator = plant
        .fs
        .unit::<MultiEffectEvaporator>(plant.evaporator)
        .expect("evaporator");
    assert_relative_eq!(evaporator.vapor_fraction(), 0.0);
}

#[test]
fn dilution_is_cleared_when_the_goal_rises_again() {
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 60.0).with_dilution(plant.dilution, "Water");
    spec.resolve(&mut plant.fs).expect("feasible");

    spec.setpoint = Setpoint::Fixed(97.5);
    spec.resolve(&mut plant.fs).expect("feasible");

    assert_relative_eq!(plant.fs.stream(plant.dilution).imass("Water").expect("known"), 0.0);
    let titer = spec.target.observe(&plant.fs).expect("known");
    assert!((titer - 97.5).abs() <= 1e-4);
}

#[test]
fn overshoot_without_dilution_keeps_minimal_processing() {
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 60.0);

    assert_eq!(spec.resolve(&mut plant.fs).expect("feasible"), Resolution::Minimal);
    let titer = spec.target.observe(&plant.fs).expect("known");
    assert_relative_eq!(titer, 80.0, epsilon = 1e-9);
}

#[test]
fn settings_tune_the_search() {
    let settings = Settings::from_toml_str(
        r"
        [bracket]
        step = 0.02

        [root]
        residual_tol = 1e-8
        x_abs_tol = 1e-12
        ",
    )
    .expect("valid");
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 97.5).with_settings(&settings);

    spec.resolve(&mut plant.fs).expect("feasible");
    let titer = spec.target.observe(&plant.fs).expect("known");
    assert!((titer - 97.5).abs() <= 1e-6, "titer {titer}");
}

#[test]
fn rejects_non_positive_setpoint() {
    let mut plant = Concentrator::new(&[101.325]);
    let mut spec = titer_spec(&plant, 0.0);
    assert!(matches!(
        spec.resolve(&mut plant.fs),
        Err(SpecError::InvalidValue { .. })
    ));
}

#[test]
fn water_multiplier_dilutes_to_goal() {
    let mut fs = Flowsheet::new(common::chemicals());
    let broth = fs.add_stream("broth").expect("unique");
    let water = fs.add_stream("water").expect("unique");
    let out = fs.add_stream("diluted").expect("unique");
    fs.stream_mut(broth).set_imass("Water", 20_000.0).expect("known");
    fs.stream_mut(broth).set_imass("LacticAcid", 5_000.0).expect("known");
    let mixer = fs
        .add_unit(Mixer::new("M304", vec![broth, water], out).with_water_multiplier("Water", 1.0))
        .expect("unique");

    let mut spec = Specification::new(
        "titer",
        DesignVariable::water_multiplier(mixer, 20.0),
        Target::titer(out, "LacticAcid"),
        Setpoint::Fixed(100.0),
        vec![mixer],
    );
    spec.resolve(&mut fs).expect("feasible");

    let m = fs
        .unit::<Mixer>(mixer)
        .expect("mixer")
        .water_multiplier()
        .expect("dilution");
    assert_relative_eq!(m, 2.3, epsilon = 1e-5);
}

#[test]
fn oil_content_uses_the_same_engine() {
    let mut fs = Flowsheet::new(
        Chemicals::new(vec![
            Chemical::liquid("Water", 18.015, 1000.0),
            Chemical::liquid("Oil", 885.4, 920.0),
        ])
        .expect("unique ids"),
    );
    let lipid = fs.add_stream("lipid_emulsion").expect("unique");
    let oil = fs.add_stream("concentrated_oil").expect("unique");
    let vapor = fs.add_stream("vapor").expect("unique");
    fs.stream_mut(lipid).set_imass("Oil", 1_000.0).expect("known");
    fs.stream_mut(lipid).set_imass("Water", 9_000.0).expect("known");
    let evaporator = fs
        .add_unit(MultiEffectEvaporator::new(
            "E601",
            lipid,
            [oil, vapor],
            "Water",
            common::effects(&[101.325]),
        ))
        .expect("unique");

    let mut spec = Specification::new(
        "oil content",
        DesignVariable::vapor_fraction(evaporator),
        Target::OilContent {
            stream: oil,
            oils: vec!["Oil".into()],
            water: "Water".into(),
        },
        Setpoint::Fixed(200.0),
        vec![evaporator],
    );
    spec.resolve(&mut fs).expect("feasible");

    // 1000 / (1000 + 9000 (1 - x)) = 0.2
    let x = spec.variable.last().expect("solved");
    assert_relative_eq!(x, 5.0 / 9.0, epsilon = 1e-5);
}
