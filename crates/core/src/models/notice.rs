use serde::{Deserialize, Serialize};

/// Which kind of market data a notice refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    Quote,
    Historical,
    Dividends,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataKind::Quote => write!(f, "quote"),
            DataKind::Historical => write!(f, "historical data"),
            DataKind::Dividends => write!(f, "dividends"),
        }
    }
}

/// A non-fatal warning surfaced to the user.
///
/// Market-data failures never abort a position operation: the operation
/// completes with fallback values and reports what went wrong here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// A single ticker could not be quoted; its buy price is used instead.
    QuoteUnavailable { ticker: String, reason: String },
    /// A whole batch of market data could not be fetched.
    FetchFailed { kind: DataKind, reason: String },
    /// The provider answered but reported an error for one ticker.
    TickerDataMissing {
        ticker: String,
        kind: DataKind,
        reason: String,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::QuoteUnavailable { ticker, reason } => write!(
                f,
                "Could not fetch a quote for {ticker} ({reason}); using the buy price"
            ),
            Notice::FetchFailed { kind, reason } => {
                write!(f, "Could not fetch {kind}: {reason}")
            }
            Notice::TickerDataMissing {
                ticker,
                kind,
                reason,
            } => write!(f, "No {kind} for {ticker}: {reason}"),
        }
    }
}

/// Outcome of a full market-data refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Positions whose price was updated from a quote
    pub quotes_applied: usize,
    /// Tickers with a usable historical series
    pub historical_loaded: usize,
    /// Tickers with dividend history
    pub dividends_loaded: usize,
    pub notices: Vec<Notice>,
}

impl RefreshReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.notices.is_empty()
    }
}
