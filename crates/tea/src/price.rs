use retort_flowsheet::{Flowsheet, StreamId, System};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{Tea, TeaError};

/// Repetition counts for [`PriceSolver`].
///
/// The price of the main product does not enter the mass balance, but
/// byproduct credits and recycle state can shift between simulations, so
/// both steps are repeated a fixed number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Outer simulations before pricing.
    pub simulations: usize,
    /// Break-even price updates.
    pub iterations: usize,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            simulations: 3,
            iterations: 3,
        }
    }
}

/// Finds the minimum selling price of a product on a converged flowsheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceSolver {
    pub config: PriceConfig,
}

impl PriceSolver {
    #[must_use]
    pub fn new(config: PriceConfig) -> Self {
        Self { config }
    }

    /// Simulates, then repeatedly solves and stores the break-even price of
    /// `product`. Returns the final price in USD/kg.
    ///
    /// # Errors
    ///
    /// Returns the system's convergence failure or
    /// [`TeaError::ZeroProductFlow`].
    pub fn solve<T: Tea>(
        &self,
        flowsheet: &mut Flowsheet,
        system: &System,
        tea: &T,
        product: StreamId,
    ) -> Result<f64, TeaError> {
        for _ in 0..self.config.simulations {
            system.simulate(flowsheet)?;
        }
        let mut price = flowsheet.stream(product).price;
        for iter in 1..=self.config.iterations {
            price = tea.solve_price(flowsheet, product)?;
            flowsheet.stream_mut(product).price = price;
            debug!(iter, price, "price update");
        }
        info!(
            product = flowsheet.stream(product).id(),
            price,
            npv = tea.npv(flowsheet),
            "break-even price"
        );
        Ok(price)
    }
}

/// Converts a price per kg of product stream into a price per kg of the
/// named chemical in it.
///
/// # Errors
///
/// Returns [`TeaError::ZeroProductFlow`] if the stream carries none of the
/// chemical, or an error if the chemical is unknown.
pub fn price_per_pure_kg(
    flowsheet: &Flowsheet,
    product: StreamId,
    chemical: &str,
    price: f64,
) -> Result<f64, TeaError> {
    let stream = flowsheet.stream(product);
    let pure = stream.imass(chemical)?;
    if pure <= 0.0 {
        return Err(TeaError::ZeroProductFlow(stream.id().to_owned()));
    }
    Ok(price * stream.f_mass() / pure)
}
