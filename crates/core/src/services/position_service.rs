use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::market::Quote;
use crate::models::notice::Notice;
use crate::models::position::{normalize_ticker, ImportRecord, Position, PositionPatch};
use crate::services::color_service;

/// Longest ticker the backend accepts.
const MAX_TICKER_LEN: usize = 20;

/// A change to the position list.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionAction {
    /// Replace the position with the same ticker in place, or append.
    Upsert(Position),
    /// `Upsert` applied in order for each position.
    UpsertMany(Vec<Position>),
    /// Remove the position with this ticker, if any.
    Remove(String),
    /// Update some fields of an existing position.
    Patch { ticker: String, patch: PositionPatch },
    /// Merge fresh quotes onto the matching positions.
    ApplyQuotes(Vec<Quote>),
    /// Swap in a whole new list (e.g. loaded from the server).
    Replace(Vec<Position>),
}

/// Position list reconciliation: upsert-by-ticker, quote merging, bulk
/// import parsing and validation.
///
/// `reduce` is a pure reducer (old list + action → new list), so ordering and
/// idempotence of every change can be tested without any I/O.
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Apply an action to a position list, returning the new list.
    #[must_use]
    pub fn reduce(&self, state: &[Position], action: PositionAction) -> Vec<Position> {
        let mut next = state.to_vec();
        match action {
            PositionAction::Upsert(position) => Self::upsert_into(&mut next, position),
            PositionAction::UpsertMany(positions) => {
                for position in positions {
                    Self::upsert_into(&mut next, position);
                }
            }
            PositionAction::Remove(ticker) => {
                let ticker = normalize_ticker(&ticker);
                next.retain(|p| p.ticker != ticker);
            }
            PositionAction::Patch { ticker, patch } => {
                let ticker = normalize_ticker(&ticker);
                if let Some(position) = next.iter_mut().find(|p| p.ticker == ticker) {
                    Self::apply_patch(position, patch);
                }
            }
            PositionAction::ApplyQuotes(quotes) => {
                let by_ticker: HashMap<String, &Quote> = quotes
                    .iter()
                    .map(|q| (normalize_ticker(&q.ticker), q))
                    .collect();
                for position in &mut next {
                    if let Some(quote) = by_ticker.get(&position.ticker) {
                        Self::apply_quote(position, quote);
                    }
                }
            }
            PositionAction::Replace(positions) => {
                next.clear();
                for position in positions {
                    Self::upsert_into(&mut next, position);
                }
            }
        }
        next
    }

    /// Fill a freshly entered position from its quote.
    ///
    /// A usable quote supplies name, current price and dividend yield. Without
    /// one the position keeps its own name, has no current price (so it is
    /// valued at its buy price) and a notice explains why.
    #[must_use]
    pub fn enrich(&self, mut draft: Position, quote: Option<&Quote>) -> (Position, Option<Notice>) {
        match quote {
            Some(q) if q.usable_price().is_some() => {
                if let Some(name) = q.name.as_deref().filter(|n| !n.trim().is_empty()) {
                    draft.name = Some(name.to_string());
                }
                draft.current_price = q.usable_price();
                draft.dividend_yield = q.dividend_yield.filter(|y| y.is_finite());
                (draft, None)
            }
            other => {
                let reason = match other.and_then(|q| q.error.clone()) {
                    Some(error) => error,
                    None if other.is_some() => "quote has no price".to_string(),
                    None => "ticker missing from provider response".to_string(),
                };
                draft.current_price = None;
                let notice = Notice::QuoteUnavailable {
                    ticker: draft.ticker.clone(),
                    reason,
                };
                (draft, Some(notice))
            }
        }
    }

    /// Check a position before it enters the list.
    pub fn validate(&self, position: &Position) -> Result<(), CoreError> {
        Self::validate_fields(&position.ticker, position.quantity, position.buy_price)
    }

    /// Check the fields a patch sets. A patch that sets nothing is rejected.
    pub fn validate_patch(&self, patch: &PositionPatch) -> Result<(), CoreError> {
        if patch.is_empty() {
            return Err(CoreError::Validation("Nothing to update".into()));
        }
        if let Some(quantity) = patch.quantity {
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "Quantity must be positive, got {quantity}"
                )));
            }
        }
        if let Some(buy_price) = patch.buy_price {
            if !buy_price.is_finite() || buy_price < 0.0 {
                return Err(CoreError::Validation(format!(
                    "Buy price must not be negative, got {buy_price}"
                )));
            }
        }
        Ok(())
    }

    /// Parse a bulk import document.
    ///
    /// The document must be a JSON array of `{ticker, quantity, buyPrice, color?, name?}`.
    /// Anything else, or any single invalid record, rejects the whole document.
    pub fn parse_import(&self, json: &str) -> Result<Vec<ImportRecord>, CoreError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CoreError::Import(format!("Invalid JSON: {e}")))?;

        let items = match value {
            serde_json::Value::Array(items) => items,
            other => {
                return Err(CoreError::Import(format!(
                    "Expected a JSON array of positions, found {}",
                    json_kind(&other)
                )))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let mut record: ImportRecord = serde_json::from_value(item)
                    .map_err(|e| CoreError::Import(format!("Record {i}: {e}")))?;
                record.ticker = normalize_ticker(&record.ticker);
                Self::validate_fields(&record.ticker, record.quantity, record.buy_price)
                    .map_err(|e| CoreError::Import(format!("Record {i}: {e}")))?;
                Ok(record)
            })
            .collect()
    }

    /// Turn import records into unpriced positions, assigning a random
    /// color to records without one.
    #[must_use]
    pub fn drafts_from_records(&self, records: &[ImportRecord]) -> Vec<Position> {
        records
            .iter()
            .map(|r| {
                let mut draft = Position::new(&r.ticker, r.quantity, r.buy_price);
                draft.name = r.name.clone().filter(|n| !n.trim().is_empty());
                draft.color = Some(
                    r.color
                        .clone()
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(color_service::random_color),
                );
                draft
            })
            .collect()
    }

    /// Positions in the bulk import/export format.
    #[must_use]
    pub fn export(&self, positions: &[Position]) -> Vec<ImportRecord> {
        positions.iter().map(ImportRecord::from).collect()
    }

    /// Tickers in list order.
    #[must_use]
    pub fn tickers(&self, positions: &[Position]) -> Vec<String> {
        positions.iter().map(|p| p.ticker.clone()).collect()
    }

    /// Identity of the set of tickers held, independent of order:
    /// sorted and comma-joined.
    #[must_use]
    pub fn fingerprint(&self, positions: &[Position]) -> String {
        let mut tickers = self.tickers(positions);
        tickers.sort();
        tickers.dedup();
        tickers.join(",")
    }

    fn upsert_into(list: &mut Vec<Position>, mut position: Position) {
        position.ticker = normalize_ticker(&position.ticker);
        match list.iter().position(|p| p.ticker == position.ticker) {
            Some(idx) => list[idx] = position,
            None => list.push(position),
        }
    }

    fn apply_patch(position: &mut Position, patch: PositionPatch) {
        if let Some(name) = patch.name {
            position.name = Some(name);
        }
        if let Some(quantity) = patch.quantity {
            position.quantity = quantity;
        }
        if let Some(buy_price) = patch.buy_price {
            position.buy_price = buy_price;
        }
        if let Some(color) = patch.color {
            position.color = Some(color);
        }
    }

    fn apply_quote(position: &mut Position, quote: &Quote) {
        let Some(price) = quote.usable_price() else {
            return;
        };
        position.current_price = Some(price);
        if let Some(dividend_yield) = quote.dividend_yield.filter(|y| y.is_finite() && *y > 0.0) {
            position.dividend_yield = Some(dividend_yield);
        }
        if let Some(name) = quote.name.as_deref().filter(|n| !n.trim().is_empty()) {
            position.name = Some(name.to_string());
        }
    }

    fn validate_fields(ticker: &str, quantity: f64, buy_price: f64) -> Result<(), CoreError> {
        if ticker.is_empty() {
            return Err(CoreError::Validation("Ticker must not be empty".into()));
        }
        if ticker.len() > MAX_TICKER_LEN {
            return Err(CoreError::Validation(format!(
                "Ticker '{ticker}' is longer than {MAX_TICKER_LEN} characters"
            )));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Quantity for {ticker} must be positive, got {quantity}"
            )));
        }
        if !buy_price.is_finite() || buy_price < 0.0 {
            return Err(CoreError::Validation(format!(
                "Buy price for {ticker} must not be negative, got {buy_price}"
            )));
        }
        Ok(())
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
