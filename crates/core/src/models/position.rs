use serde::{Deserialize, Deserializer, Serialize};

/// Normalize a ticker symbol the way positions are keyed: trimmed, upper-case.
#[must_use]
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// A stock holding in the portfolio.
///
/// The ticker is the natural key: a portfolio holds at most one position
/// per ticker. `current_price` stays `None` until a quote has been applied,
/// in which case valuation falls back to `buy_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Ticker symbol, uppercased (e.g., "AAPL", "SOLB")
    pub ticker: String,

    /// Company name, filled in from a quote when available
    #[serde(default)]
    pub name: Option<String>,

    /// Number of shares held
    pub quantity: f64,

    /// Purchase price per share
    pub buy_price: f64,

    /// Latest known market price per share
    #[serde(default)]
    pub current_price: Option<f64>,

    /// Annual dividend yield in percent (e.g., 3.2 for 3.2%)
    #[serde(default)]
    pub dividend_yield: Option<f64>,

    /// Chart color (hex, e.g., "#3b82f6")
    #[serde(default)]
    pub color: Option<String>,
}

impl Position {
    pub fn new(ticker: impl AsRef<str>, quantity: f64, buy_price: f64) -> Self {
        Self {
            ticker: normalize_ticker(ticker.as_ref()),
            name: None,
            quantity,
            buy_price,
            current_price: None,
            dividend_yield: None,
            color: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_current_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Name to show in listings: the company name, or the ticker if unknown.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.ticker)
    }
}

/// Partial update of a position. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub buy_price: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

impl PositionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.buy_price.is_none()
            && self.color.is_none()
    }
}

/// One record of the bulk import/export JSON format:
/// `[{"ticker": "AAPL", "quantity": 10, "buyPrice": 150.0, "color": "#3b82f6"}]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub ticker: String,
    pub quantity: f64,
    pub buy_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Position> for ImportRecord {
    fn from(p: &Position) -> Self {
        Self {
            ticker: p.ticker.clone(),
            quantity: p.quantity,
            buy_price: p.buy_price,
            color: p.color.clone(),
            name: None,
        }
    }
}

/// A position row as stored by the backend (`/portfolio/positions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPosition {
    pub id: i64,
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub quantity: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub buy_price: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<PersistedPosition> for Position {
    fn from(row: PersistedPosition) -> Self {
        Self {
            ticker: normalize_ticker(&row.ticker),
            name: row.name,
            quantity: row.quantity,
            buy_price: row.buy_price,
            current_price: None,
            dividend_yield: None,
            color: row.color,
        }
    }
}

/// Body of `POST /portfolio/positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPersistedPosition {
    pub ticker: String,
    pub name: String,
    pub quantity: f64,
    pub buy_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&Position> for NewPersistedPosition {
    fn from(p: &Position) -> Self {
        Self {
            ticker: p.ticker.clone(),
            name: p.display_name().to_string(),
            quantity: p.quantity,
            buy_price: p.buy_price,
            color: p.color.clone(),
        }
    }
}

/// Body of `PUT /portfolio/positions/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedPositionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The backend stores quantities and prices as decimals, which may arrive
/// as JSON strings (`"10.50"`) rather than numbers.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid decimal '{s}': {e}"))),
    }
}
