use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio-wide value and profit/loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    /// Sum of current position values
    pub total_value: f64,

    /// Sum of buy price × quantity
    pub total_invested: f64,

    /// total_value - total_invested
    pub total_pl: f64,

    /// total_pl / total_invested × 100, or 0 when nothing is invested
    pub total_pl_percent: f64,
}

/// Share of the portfolio held in one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub ticker: String,
    pub value: f64,
    /// Percentage of total portfolio value
    pub percent: f64,
    pub color: String,
}

/// Relative performance on one date: ticker → % change since the first close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub changes: BTreeMap<String, f64>,
}
