//! Economic and environmental post-processing for Retort flowsheets.
//!
//! Once a flowsheet and its specifications have converged, this crate
//! computes the break-even price of the main product ([`BreakEvenTea`],
//! driven by [`PriceSolver`]) and its global warming potential and fossil
//! energy consumption per kg ([`Lca`]).

mod error;
mod lca;
mod price;
mod tea;

pub use error::TeaError;
pub use lca::{CO2_MOLAR_MASS, CharacterizationFactors, Lca};
pub use price::{PriceConfig, PriceSolver, price_per_pure_kg};
pub use tea::{BreakEvenTea, Financials, Tea};
