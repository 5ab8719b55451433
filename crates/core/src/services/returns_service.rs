use std::collections::HashMap;

use crate::models::market::{HistoricalPricePoint, HistoricalSeries};
use crate::models::position::normalize_ticker;
use crate::models::settings::Annualization;

const DAYS_PER_YEAR: f64 = 365.25;

/// Estimates annualized growth (CAGR) from historical close prices.
///
/// CAGR = (end / start)^(1 / years) - 1, as a decimal (0.05 = 5% per year).
/// Degenerate inputs yield `0.0`, a flat projection, instead of NaN.
pub struct ReturnsService {
    annualization: Annualization,
}

impl ReturnsService {
    pub fn new(annualization: Annualization) -> Self {
        Self { annualization }
    }

    pub fn annualization(&self) -> Annualization {
        self.annualization
    }

    /// Annualized return of an ascending price series.
    ///
    /// Returns `0.0` when:
    /// - there are fewer than 2 samples
    /// - the first close is zero, negative or not finite
    /// - the last close is negative or not finite
    /// - the computed rate is not finite
    #[must_use]
    pub fn historical_return(&self, series: &[HistoricalPricePoint]) -> f64 {
        let (first, last) = match (series.first(), series.last()) {
            (Some(first), Some(last)) if series.len() >= 2 => (first, last),
            _ => return 0.0,
        };

        let start = first.close;
        let end = last.close;
        if !start.is_finite() || start <= 0.0 || !end.is_finite() || end < 0.0 {
            return 0.0;
        }

        let years = self.years(series.len(), first, last);
        if !years.is_finite() || years <= 0.0 {
            return 0.0;
        }

        let cagr = (end / start).powf(1.0 / years) - 1.0;
        if cagr.is_finite() {
            cagr
        } else {
            0.0
        }
    }

    /// Annual return for every ticker with a non-empty series, keyed by
    /// normalized ticker. Tickers without data are left out (treated as 0
    /// by the projector).
    #[must_use]
    pub fn historical_returns(&self, series: &[HistoricalSeries]) -> HashMap<String, f64> {
        series
            .iter()
            .filter(|s| !s.historical.is_empty())
            .map(|s| (normalize_ticker(&s.ticker), self.historical_return(&s.historical)))
            .collect()
    }

    fn years(
        &self,
        samples: usize,
        first: &HistoricalPricePoint,
        last: &HistoricalPricePoint,
    ) -> f64 {
        match self.annualization {
            Annualization::SampleCount { per_year } => samples as f64 / per_year,
            Annualization::DateSpan => {
                let days = (last.date - first.date).num_days();
                if days > 0 {
                    days as f64 / DAYS_PER_YEAR
                } else {
                    // Undated or same-day samples: fall back to monthly sampling
                    samples as f64 / 12.0
                }
            }
        }
    }
}

impl Default for ReturnsService {
    fn default() -> Self {
        Self::new(Annualization::default())
    }
}
