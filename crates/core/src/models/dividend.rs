use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dividend payment scaled to the quantity held.
///
/// Derived from a [`DividendPayment`](super::market::DividendPayment) and the
/// matching position; recomputed whenever either changes, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub ticker: String,
    /// Display name of the position (company name or ticker)
    pub name: String,
    /// Total amount received: per-share amount × quantity held
    pub amount: f64,
    #[serde(default)]
    pub yield_pct: Option<f64>,
    #[serde(default)]
    pub price_at_payment: Option<f64>,
}

/// Aggregate statistics over a set of dividend events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendSummary {
    pub total_amount: f64,
    pub total_payments: usize,
    pub last_payment_date: Option<NaiveDate>,
}

/// Dividends received in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDividendTotal {
    /// 1 = January … 12 = December
    pub month: u32,
    pub total: f64,
}

/// Per-ticker overview of the raw payment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerDividendHistory {
    pub ticker: String,
    pub payments: usize,
    pub first_payment: Option<NaiveDate>,
    pub last_payment: Option<NaiveDate>,
    /// Mean yield over the payments that report one
    pub average_yield: Option<f64>,
}
