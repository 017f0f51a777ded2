use retort_flowsheet::{Flowsheet, StreamId};
use serde::Deserialize;
use uom::si::power::kilowatt;

use crate::TeaError;

/// Economic model of a converged flowsheet.
pub trait Tea {
    /// Returns the price of `product` (USD/kg) at which the plant breaks
    /// even, given the current prices of every other stream.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::ZeroProductFlow`] if `product` carries no mass.
    fn solve_price(&self, flowsheet: &Flowsheet, product: StreamId) -> Result<f64, TeaError>;

    /// Net present value (USD) at the current stream prices.
    fn npv(&self, flowsheet: &Flowsheet) -> f64;
}

/// Financial parameters of a [`BreakEvenTea`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Financials {
    /// Total capital investment in USD, spent at year zero.
    pub capital: f64,
    /// Internal rate of return used as the discount rate.
    pub irr: f64,
    /// Plant life in years.
    pub lifetime: u32,
    /// Operating hours per year.
    pub operating_hours: f64,
    /// Labor, maintenance, and insurance in USD/yr.
    pub fixed_operating_cost: f64,
    /// Grid electricity price in USD/kWh.
    pub electricity_price: f64,
}

impl Default for Financials {
    fn default() -> Self {
        Self {
            capital: 0.0,
            irr: 0.10,
            lifetime: 30,
            operating_hours: 8410.0,
            fixed_operating_cost: 0.0,
            electricity_price: 0.0782,
        }
    }
}

impl Financials {
    /// Validates rates and horizons.
    ///
    /// # Errors
    ///
    /// Returns [`TeaError::InvalidParameter`] for a negative or non-finite
    /// value, a non-positive IRR, or a zero lifetime.
    pub fn validate(&self) -> Result<(), TeaError> {
        let checks = [
            ("capital", self.capital, self.capital >= 0.0),
            ("irr", self.irr, self.irr > 0.0),
            ("lifetime", f64::from(self.lifetime), self.lifetime > 0),
            ("operating_hours", self.operating_hours, self.operating_hours > 0.0),
            ("fixed_operating_cost", self.fixed_operating_cost, self.fixed_operating_cost >= 0.0),
            ("electricity_price", self.electricity_price, self.electricity_price >= 0.0),
        ];
        match checks
            .into_iter()
            .find(|&(_, value, ok)| !(ok && value.is_finite()))
        {
            Some((name, value, _)) => Err(TeaError::InvalidParameter { name, value }),
            None => Ok(()),
        }
    }

    /// Capital recovery factor: the annual payment per USD of capital that
    /// pays it back over `lifetime` years at `irr`.
    #[must_use]
    pub fn capital_recovery_factor(&self) -> f64 {
        1.0 / self.annuity_factor()
    }

    /// Present value of 1 USD received at the end of every year.
    #[must_use]
    pub fn annuity_factor(&self) -> f64 {
        let n = i32::try_from(self.lifetime).unwrap_or(i32::MAX);
        (1.0 - (1.0 + self.irr).powi(-n)) / self.irr
    }
}

/// Discounted cash-flow model with level annual cash flows.
///
/// Every year of operation earns sales of priced products and pays for
/// priced feeds, grid electricity, and fixed operating costs. The
/// break-even product price makes the net present value zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakEvenTea {
    pub financials: Financials,
}

impl BreakEvenTea {
    /// # Errors
    ///
    /// Returns [`TeaError::InvalidParameter`] if the financials are invalid.
    pub fn new(financials: Financials) -> Result<Self, TeaError> {
        financials.validate()?;
        Ok(Self { financials })
    }

    /// Net hourly cash flow (USD/hr) excluding `exclude`, if given.
    fn hourly_cash_flow(&self, flowsheet: &Flowsheet, exclude: Option<StreamId>) -> f64 {
        let feeds: f64 = flowsheet
            .feeds()
            .map(|id| flowsheet.stream(id).cost())
            .sum();
        let sales: f64 = flowsheet
            .products()
            .filter(|&id| Some(id) != exclude)
            .map(|id| flowsheet.stream(id).cost())
            .sum();
        let electricity =
            flowsheet.power().get::<kilowatt>() * self.financials.electricity_price;
        sales - feeds - electricity
    }
}

impl Tea for BreakEvenTea {
    fn solve_price(&self, flowsheet: &Flowsheet, product: StreamId) -> Result<f64, TeaError> {
        let stream = flowsheet.stream(product);
        let mass = stream.f_mass();
        if mass <= 0.0 {
            return Err(TeaError::ZeroProductFlow(stream.id().to_owned()));
        }
        let f = &self.financials;
        let annual_required = f.capital * f.capital_recovery_factor() + f.fixed_operating_cost
            - f.operating_hours * self.hourly_cash_flow(flowsheet, Some(product));
        Ok(annual_required / (f.operating_hours * mass))
    }

    fn npv(&self, flowsheet: &Flowsheet) -> f64 {
        let f = &self.financials;
        let annual =
            f.operating_hours * self.hourly_cash_flow(flowsheet, None) - f.fixed_operating_cost;
        annual * f.annuity_factor() - f.capital
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn capital_recovery_matches_annuity_formula() {
        let f = Financials {
            irr: 0.1,
            lifetime: 30,
            ..Financials::default()
        };
        // i (1 + i)^n / ((1 + i)^n - 1)
        let growth = 1.1_f64.powi(30);
        assert_relative_eq!(
            f.capital_recovery_factor(),
            0.1 * growth / (growth - 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn rejects_invalid_financials() {
        let bad = [
            Financials {
                irr: 0.0,
                ..Financials::default()
            },
            Financials {
                lifetime: 0,
                ..Financials::default()
            },
            Financials {
                capital: f64::NAN,
                ..Financials::default()
            },
        ];
        for financials in bad {
            assert!(matches!(
                BreakEvenTea::new(financials),
                Err(TeaError::InvalidParameter { .. })
            ));
        }
    }
}
