use std::collections::{BTreeMap, HashMap};

use crate::models::position::Position;
use crate::models::projection::{
    AggregatedPoint, DetailedPoint, FinalValues, Projection, ProjectionMode,
};
use crate::services::valuation_service::ValuationService;

/// Compounds position values forward year by year.
///
/// Growth rates come from a ticker → annual return map (decimal, e.g. 0.07).
/// A ticker missing from the map grows at 0%; a position without a dividend
/// yield contributes no dividend growth.
///
/// Pure: identical inputs give identical output.
pub struct ProjectionService {
    valuation: ValuationService,
}

impl ProjectionService {
    pub fn new() -> Self {
        Self {
            valuation: ValuationService::new(),
        }
    }

    /// Project the portfolio over `years` years, emitting rows for years `0..=years`.
    #[must_use]
    pub fn project(
        &self,
        positions: &[Position],
        annual_returns: &HashMap<String, f64>,
        years: u32,
        mode: ProjectionMode,
    ) -> Projection {
        match mode {
            ProjectionMode::Aggregated => {
                Projection::Aggregated(self.project_aggregated(positions, annual_returns, years))
            }
            ProjectionMode::Detailed => {
                Projection::Detailed(self.project_detailed(positions, annual_returns, years))
            }
        }
    }

    /// Two portfolio totals per year:
    /// - `with_dividends` compounds each position at `return + yield / 100`
    /// - `without_dividends` compounds at `return` only
    ///
    /// Year 0 is the current total value for both series.
    #[must_use]
    pub fn project_aggregated(
        &self,
        positions: &[Position],
        annual_returns: &HashMap<String, f64>,
        years: u32,
    ) -> Vec<AggregatedPoint> {
        let growth: Vec<(f64, f64)> = positions
            .iter()
            .map(|p| {
                let price_growth = annual_return(annual_returns, p);
                (price_growth, price_growth + dividend_rate(p))
            })
            .collect();

        let mut without: Vec<f64> = positions.iter().map(|p| self.valuation.value(p)).collect();
        let mut with = without.clone();

        let mut rows = Vec::with_capacity(years as usize + 1);
        for year in 0..=years {
            rows.push(AggregatedPoint {
                year,
                with_dividends: with.iter().sum(),
                without_dividends: without.iter().sum(),
            });

            for (i, (price_growth, total_growth)) in growth.iter().enumerate() {
                without[i] *= 1.0 + price_growth;
                with[i] *= 1.0 + total_growth;
            }
        }
        rows
    }

    /// One value per position per year, compounding at the annual return only.
    /// Year 0 holds each position's current value.
    #[must_use]
    pub fn project_detailed(
        &self,
        positions: &[Position],
        annual_returns: &HashMap<String, f64>,
        years: u32,
    ) -> Vec<DetailedPoint> {
        let growth: Vec<f64> = positions
            .iter()
            .map(|p| annual_return(annual_returns, p))
            .collect();
        let mut values: Vec<f64> = positions.iter().map(|p| self.valuation.value(p)).collect();

        let mut rows = Vec::with_capacity(years as usize + 1);
        for year in 0..=years {
            let row: BTreeMap<String, f64> = positions
                .iter()
                .zip(&values)
                .map(|(p, v)| (p.ticker.clone(), *v))
                .collect();
            rows.push(DetailedPoint { year, values: row });

            for (value, rate) in values.iter_mut().zip(&growth) {
                *value *= 1.0 + rate;
            }
        }
        rows
    }

    /// Totals of the last row, or `None` for an empty projection.
    #[must_use]
    pub fn final_values(&self, projection: &Projection) -> Option<FinalValues> {
        match projection {
            Projection::Aggregated(rows) => rows.last().map(|r| FinalValues::Aggregated {
                with_dividends: r.with_dividends,
                without_dividends: r.without_dividends,
            }),
            Projection::Detailed(rows) => rows.last().map(|r| FinalValues::Detailed {
                total: r.total(),
            }),
        }
    }
}

impl Default for ProjectionService {
    fn default() -> Self {
        Self::new()
    }
}

fn annual_return(annual_returns: &HashMap<String, f64>, position: &Position) -> f64 {
    annual_returns
        .get(&position.ticker)
        .copied()
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

fn dividend_rate(position: &Position) -> f64 {
    position
        .dividend_yield
        .filter(|y| y.is_finite())
        .map_or(0.0, |y| y / 100.0)
}
