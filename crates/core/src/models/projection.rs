use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a projection is broken down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Portfolio totals, with and without reinvested dividends
    Aggregated,
    /// One series per position, price growth only
    Detailed,
}

/// One year of an aggregated projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPoint {
    pub year: u32,
    pub with_dividends: f64,
    pub without_dividends: f64,
}

/// One year of a detailed projection: `{"year": 3, "AAPL": 1520.3, "MSFT": 980.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedPoint {
    pub year: u32,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl DetailedPoint {
    /// Sum across all tickers for this year.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// A projection series, rows for years `0..=N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Projection {
    Aggregated(Vec<AggregatedPoint>),
    Detailed(Vec<DetailedPoint>),
}

impl Projection {
    /// Number of rows (horizon + 1).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Projection::Aggregated(rows) => rows.len(),
            Projection::Detailed(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Values reached at the end of the projection horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FinalValues {
    Aggregated {
        with_dividends: f64,
        without_dividends: f64,
    },
    Detailed {
        total: f64,
    },
}
