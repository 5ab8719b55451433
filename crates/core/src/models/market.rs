use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Request body shared by the batch market endpoints: `{"tickers": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRequest {
    pub tickers: Vec<String>,
}

/// Latest quote for a ticker, as returned by `/market/quote(s)`.
///
/// The backend reports per-ticker failures inline: `current_price` is
/// `null` and `error` carries the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub ticker: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    /// Five-year average dividend yield in percent
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Quote {
    /// The quoted price, if the quote carries a real one.
    ///
    /// Zero, negative and non-finite prices count as "no price".
    #[must_use]
    pub fn usable_price(&self) -> Option<f64> {
        if self.error.is_some() {
            return None;
        }
        self.current_price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// A single close-price sample. Wire format: `{"Date": "2024-01-31", "Close": 101.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPricePoint {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl HistoricalPricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            volume: None,
        }
    }
}

/// Historical series for one ticker, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub ticker: String,
    #[serde(default)]
    pub historical: Vec<HistoricalPricePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One per-share dividend payment, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayment {
    pub date: NaiveDate,
    /// Amount paid per share
    pub amount: f64,
    /// Payment as a percentage of the share price on the payment date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_at_payment: Option<f64>,
}

impl DividendPayment {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self {
            date,
            amount,
            r#yield: None,
            price_at_payment: None,
        }
    }
}

/// Dividend history for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendSeries {
    pub ticker: String,
    #[serde(default)]
    pub dividends: Vec<DividendPayment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
