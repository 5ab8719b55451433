use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::models::dividend::{
    DividendEvent, DividendSummary, MonthlyDividendTotal, TickerDividendHistory,
};
use crate::models::market::DividendSeries;
use crate::models::position::{normalize_ticker, Position};

/// Turns raw per-share dividend payments into events scaled by the
/// quantity held, and answers calendar queries over them.
///
/// Pure business logic: derive again whenever positions or payment data
/// change, the result depends on nothing else.
pub struct DividendService;

impl DividendService {
    pub fn new() -> Self {
        Self
    }

    /// One event per payment of a ticker that is held, with
    /// `amount = per-share amount × quantity`. Payments for tickers
    /// without a position are dropped. Events are ordered by date, then ticker.
    #[must_use]
    pub fn build_events(
        &self,
        series: &[DividendSeries],
        positions: &[Position],
    ) -> Vec<DividendEvent> {
        let by_ticker: HashMap<&str, &Position> =
            positions.iter().map(|p| (p.ticker.as_str(), p)).collect();

        let mut events: Vec<DividendEvent> = series
            .iter()
            .filter_map(|s| {
                let ticker = normalize_ticker(&s.ticker);
                by_ticker.get(ticker.as_str()).map(|p| (s, *p))
            })
            .flat_map(|(s, position)| {
                s.dividends.iter().map(move |payment| DividendEvent {
                    date: payment.date,
                    ticker: position.ticker.clone(),
                    name: position.display_name().to_string(),
                    amount: payment.amount * position.quantity,
                    yield_pct: payment.r#yield,
                    price_at_payment: payment.price_at_payment,
                })
            })
            .collect();

        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
        events
    }

    /// Total received, number of payments and the most recent payment date.
    #[must_use]
    pub fn summary(&self, events: &[DividendEvent]) -> DividendSummary {
        DividendSummary {
            total_amount: events.iter().map(|e| e.amount).sum(),
            total_payments: events.len(),
            last_payment_date: events.iter().map(|e| e.date).max(),
        }
    }

    /// Events paid in the given calendar year.
    #[must_use]
    pub fn events_by_year<'a>(&self, events: &'a [DividendEvent], year: i32) -> Vec<&'a DividendEvent> {
        events.iter().filter(|e| e.date.year() == year).collect()
    }

    /// Sum of the amounts paid in the given calendar year.
    #[must_use]
    pub fn year_total(&self, events: &[DividendEvent], year: i32) -> f64 {
        self.events_by_year(events, year).iter().map(|e| e.amount).sum()
    }

    /// Twelve rows (January to December) with the amounts paid in each month of `year`.
    #[must_use]
    pub fn monthly_totals(&self, events: &[DividendEvent], year: i32) -> Vec<MonthlyDividendTotal> {
        let mut totals: Vec<MonthlyDividendTotal> = (1..=12)
            .map(|month| MonthlyDividendTotal { month, total: 0.0 })
            .collect();

        for event in self.events_by_year(events, year) {
            totals[event.date.month0() as usize].total += event.amount;
        }
        totals
    }

    /// Events of one month grouped by payment day (for a calendar view).
    #[must_use]
    pub fn events_by_day<'a>(
        &self,
        events: &'a [DividendEvent],
        year: i32,
        month: u32,
    ) -> BTreeMap<NaiveDate, Vec<&'a DividendEvent>> {
        let mut days: BTreeMap<NaiveDate, Vec<&DividendEvent>> = BTreeMap::new();
        for event in events
            .iter()
            .filter(|e| e.date.year() == year && e.date.month() == month)
        {
            days.entry(event.date).or_default().push(event);
        }
        days
    }

    /// Per-ticker overview of the raw payment history, in input order.
    #[must_use]
    pub fn ticker_histories(&self, series: &[DividendSeries]) -> Vec<TickerDividendHistory> {
        series
            .iter()
            .map(|s| {
                let yields: Vec<f64> = s.dividends.iter().filter_map(|d| d.r#yield).collect();
                let average_yield = if yields.is_empty() {
                    None
                } else {
                    Some(yields.iter().sum::<f64>() / yields.len() as f64)
                };

                TickerDividendHistory {
                    ticker: normalize_ticker(&s.ticker),
                    payments: s.dividends.len(),
                    first_payment: s.dividends.iter().map(|d| d.date).min(),
                    last_payment: s.dividends.iter().map(|d| d.date).max(),
                    average_yield,
                }
            })
            .collect()
    }
}

impl Default for DividendService {
    fn default() -> Self {
        Self::new()
    }
}
