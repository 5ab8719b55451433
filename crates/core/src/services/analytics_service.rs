use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::analytics::{AllocationSlice, PerformancePoint};
use crate::models::market::HistoricalPricePoint;
use crate::models::position::Position;
use crate::services::color_service;
use crate::services::valuation_service::ValuationService;

/// Chart-ready numbers derived from positions and price history.
///
/// The core computes all the numbers; a frontend only renders them.
pub struct AnalyticsService {
    valuation: ValuationService,
}

impl AnalyticsService {
    pub fn new() -> Self {
        Self {
            valuation: ValuationService::new(),
        }
    }

    /// Each position's share of the total value, in list order.
    /// Percentages are 0 when the portfolio is worth nothing.
    #[must_use]
    pub fn allocation(&self, positions: &[Position]) -> Vec<AllocationSlice> {
        let total = self.valuation.totals(positions).total_value;

        positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let value = self.valuation.value(p);
                AllocationSlice {
                    ticker: p.ticker.clone(),
                    value,
                    percent: if total > 0.0 { value / total * 100.0 } else { 0.0 },
                    color: color_service::position_color(p, i),
                }
            })
            .collect()
    }

    /// Relative performance of each held ticker over its price history.
    ///
    /// One point per date found in any series (ascending). On each date, a
    /// ticker with a sample there gets `(close / first_close - 1) * 100`.
    /// Tickers whose first close is zero are left out.
    #[must_use]
    pub fn performance_series(
        &self,
        positions: &[Position],
        historical: &HashMap<String, Vec<HistoricalPricePoint>>,
    ) -> Vec<PerformancePoint> {
        // ticker → (first close, date → close)
        let mut tracked: Vec<(&str, f64, HashMap<NaiveDate, f64>)> = Vec::new();
        for position in positions {
            let Some(series) = historical.get(&position.ticker) else {
                continue;
            };
            let Some(first) = series.first() else {
                continue;
            };
            if first.close == 0.0 || !first.close.is_finite() {
                continue;
            }
            let closes = series.iter().map(|p| (p.date, p.close)).collect();
            tracked.push((position.ticker.as_str(), first.close, closes));
        }

        let dates: BTreeSet<NaiveDate> = tracked
            .iter()
            .flat_map(|(_, _, closes)| closes.keys().copied())
            .collect();

        dates
            .into_iter()
            .map(|date| {
                let changes: BTreeMap<String, f64> = tracked
                    .iter()
                    .filter_map(|(ticker, first, closes)| {
                        closes
                            .get(&date)
                            .map(|close| (ticker.to_string(), (close / first - 1.0) * 100.0))
                    })
                    .collect();
                PerformancePoint { date, changes }
            })
            .collect()
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
