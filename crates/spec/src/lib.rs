//! Process specifications for Retort flowsheets.
//!
//! A specification drives one design variable (an evaporator's vapor
//! fraction, a mixer's water multiplier) until a target observed downstream
//! (titer, oil content, yield) meets its setpoint. Each trial re-runs only a
//! declared unit path; the outer recycle convergence of the [`System`] runs
//! afterwards.
//!
//! - [`PathEvaluator`] and [`Deviation`] adapt a flowsheet path to the
//!   solvers in `retort-solvers`
//! - [`Specification`] combines bracket search, stage trimming, closed-form
//!   dilution, and warm-started root finding
//! - [`DilutionSpecification`] resolves titer by proportional water updates
//! - [`YieldSpecification`] rewrites reaction conversions for a yield target
//! - [`ProcessSpecification`] loads yield, titer, and productivity in order
//!
//! Specifications implement [`SpecificationHook`], so they can be installed
//! on a unit and re-resolved on every simulation pass.
//!
//! [`System`]: retort_flowsheet::System
//! [`SpecificationHook`]: retort_flowsheet::SpecificationHook

mod controller;
mod dilution;
mod error;
mod evaluator;
mod settings;
mod specification;
mod target;
mod variable;
mod yields;

pub use controller::{ProcessSpecification, SpecKind, SpecState};
pub use dilution::DilutionSpecification;
pub use error::SpecError;
pub use evaluator::{Deviation, PathEvaluator};
pub use settings::Settings;
pub use specification::{Dilution, Resolution, Specification};
pub use target::{DEGENERATE_RATIO, Setpoint, Target, guarded_ratio};
pub use variable::{DesignVariable, Knob};
pub use yields::{
    CONVERSION_CAP, Conversions, Follower, ReactionGroup, YieldSpecification, renormalize,
};
