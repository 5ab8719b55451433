pub mod api;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{
    analytics::{AllocationSlice, PerformancePoint, PortfolioTotals},
    dividend::{DividendEvent, DividendSummary, MonthlyDividendTotal, TickerDividendHistory},
    market::{DividendSeries, HistoricalPricePoint, HistoricalSeries, Quote},
    notice::{DataKind, Notice, RefreshReport},
    position::{normalize_ticker, Position, PositionPatch},
    projection::{FinalValues, Projection, ProjectionMode},
    settings::Settings,
};
use providers::traits::{MarketDataProvider, PositionStore};
use services::{
    analytics_service::AnalyticsService,
    color_service,
    dividend_service::DividendService,
    position_service::{PositionAction, PositionService},
    projection_service::ProjectionService,
    returns_service::ReturnsService,
    valuation_service::ValuationService,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use errors::CoreError;

/// Longest projection horizon accepted, in years.
pub const MAX_PROJECTION_YEARS: u32 = 100;

/// Main entry point for the portfolio tracker core library.
///
/// Holds the position list and the market data fetched for it, and answers
/// every derived query (totals, projections, dividend calendar) from that
/// state. Market-data failures never abort an operation: positions fall back
/// to their buy price and the failure comes back as a [`Notice`]. Only an
/// expired session is returned as an error.
#[must_use]
pub struct PortfolioTracker {
    positions: Vec<Position>,
    /// Close prices per held ticker, ascending by date
    historical: HashMap<String, Vec<HistoricalPricePoint>>,
    /// Annualized return per held ticker, derived from `historical`
    returns: HashMap<String, f64>,
    /// Raw per-share dividend payments; events are derived on demand
    dividends: Vec<DividendSeries>,
    /// Ticker set `dividends` was fetched for
    dividends_fingerprint: Option<String>,
    settings: Settings,
    provider: Box<dyn MarketDataProvider>,
    position_service: PositionService,
    valuation_service: ValuationService,
    returns_service: ReturnsService,
    projection_service: ProjectionService,
    dividend_service: DividendService,
    analytics_service: AnalyticsService,
    /// Tracks whether positions changed since the last load/save.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("positions", &self.positions.len())
            .field("historical", &self.historical.len())
            .field("dividends", &self.dividends.len())
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioTracker {
    /// Empty portfolio with default settings.
    pub fn new(provider: Box<dyn MarketDataProvider>) -> Self {
        Self::build(provider, Settings::default())
    }

    /// Empty portfolio with the given settings, validated first.
    pub fn with_settings(
        provider: Box<dyn MarketDataProvider>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(provider, settings))
    }

    /// Empty portfolio reading market data from the backend behind `client`.
    pub fn with_client(client: Arc<api::client::ApiClient>, settings: Settings) -> Result<Self, CoreError> {
        Self::with_settings(Box::new(api::market::MarketApi::new(client)), settings)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Positions ───────────────────────────────────────────────────

    /// All positions, in the order they were added.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Look up a position by ticker (case-insensitive).
    #[must_use]
    pub fn position(&self, ticker: &str) -> Option<&Position> {
        let ticker = normalize_ticker(ticker);
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    #[must_use]
    pub fn tickers(&self) -> Vec<String> {
        self.position_service.tickers(&self.positions)
    }

    /// Add a position, or replace the one with the same ticker.
    ///
    /// The position is priced from a fresh quote and its price history is
    /// loaded. If either fetch fails the position is still added (valued at
    /// its buy price) and the returned notices say what is missing.
    pub async fn add_position(
        &mut self,
        ticker: &str,
        name: Option<&str>,
        quantity: f64,
        buy_price: f64,
        color: Option<&str>,
    ) -> Result<Vec<Notice>, CoreError> {
        let mut draft = Position::new(ticker, quantity, buy_price);
        draft.name = name.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        draft.color = Some(
            color
                .filter(|c| !c.is_empty())
                .map_or_else(color_service::random_color, String::from),
        );
        self.position_service.validate(&draft)?;

        let mut notices = Vec::new();
        let (position, notice) = match self.provider.get_quote(&draft.ticker).await {
            Ok(quote) => self.position_service.enrich(draft, Some(&quote)),
            Err(CoreError::SessionExpired) => return Err(CoreError::SessionExpired),
            Err(e) => {
                log::warn!("Quote for {} unavailable: {e}", draft.ticker);
                let (position, _) = self.position_service.enrich(draft, None);
                let notice = Notice::QuoteUnavailable {
                    ticker: position.ticker.clone(),
                    reason: e.to_string(),
                };
                (position, Some(notice))
            }
        };
        notices.extend(notice);

        let series = self
            .fetch_historical(std::slice::from_ref(&position.ticker), &mut notices)
            .await?;

        log::info!("Adding position {}", position.ticker);
        self.apply(PositionAction::Upsert(position));
        self.commit_historical(series, &mut notices);
        Ok(notices)
    }

    /// Remove a position and its price history.
    /// Returns `true` if a position was removed.
    pub fn delete_position(&mut self, ticker: &str) -> bool {
        let ticker = normalize_ticker(ticker);
        if self.position(&ticker).is_none() {
            return false;
        }
        self.apply(PositionAction::Remove(ticker.clone()));
        self.historical.remove(&ticker);
        self.returns.remove(&ticker);
        log::info!("Removed position {ticker}");
        true
    }

    /// Change name, quantity, buy price or color of an existing position.
    pub fn update_position(&mut self, ticker: &str, patch: PositionPatch) -> Result<(), CoreError> {
        self.position_service.validate_patch(&patch)?;
        let ticker = normalize_ticker(ticker);
        if self.position(&ticker).is_none() {
            return Err(CoreError::PositionNotFound(ticker));
        }
        self.apply(PositionAction::Patch { ticker, patch });
        Ok(())
    }

    // ── Import / Export ─────────────────────────────────────────────

    /// Import positions from a JSON array of
    /// `{ticker, quantity, buyPrice, color?, name?}` records.
    ///
    /// The document is accepted or rejected as a whole: on any parse or
    /// validation error nothing changes. Accepted records are priced with
    /// one batch quote request and upserted by ticker.
    pub async fn import_positions_from_json(&mut self, json: &str) -> Result<Vec<Notice>, CoreError> {
        let records = self.position_service.parse_import(json)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let drafts = self.position_service.drafts_from_records(&records);
        let tickers = self.position_service.tickers(&drafts);
        let mut notices = Vec::new();

        let positions: Vec<Position> = match self.provider.get_quotes(&tickers).await {
            Ok(quotes) => {
                let by_ticker: HashMap<String, &Quote> = quotes
                    .iter()
                    .map(|q| (normalize_ticker(&q.ticker), q))
                    .collect();
                drafts
                    .into_iter()
                    .map(|draft| {
                        let quote = by_ticker.get(&draft.ticker).copied();
                        let (position, notice) = self.position_service.enrich(draft, quote);
                        notices.extend(notice);
                        position
                    })
                    .collect()
            }
            Err(CoreError::SessionExpired) => return Err(CoreError::SessionExpired),
            Err(e) => {
                notices.push(fetch_failed(DataKind::Quote, &e));
                drafts
                    .into_iter()
                    .map(|draft| self.position_service.enrich(draft, None).0)
                    .collect()
            }
        };

        let mut unique = tickers;
        unique.sort();
        unique.dedup();
        let series = self.fetch_historical(&unique, &mut notices).await?;

        log::info!("Importing {} positions", positions.len());
        self.apply(PositionAction::UpsertMany(positions));
        self.commit_historical(series, &mut notices);
        Ok(notices)
    }

    /// Export positions as a pretty-printed JSON array in the import format.
    pub fn export_positions_to_json(&self) -> Result<String, CoreError> {
        let records = self.position_service.export(&self.positions);
        serde_json::to_string_pretty(&records)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize positions to JSON: {e}")))
    }

    // ── Market Data ─────────────────────────────────────────────────

    /// Refresh quotes, price history and dividends for every held ticker.
    ///
    /// The three fetches run concurrently against a snapshot of the tickers.
    /// Each result is committed on its own: a failed fetch becomes a notice
    /// and does not discard the others. Only an expired session aborts the
    /// refresh, before anything is committed.
    pub async fn refresh(&mut self) -> Result<RefreshReport, CoreError> {
        let tickers = self.tickers();
        if tickers.is_empty() {
            return Ok(RefreshReport::default());
        }
        let fingerprint = self.position_service.fingerprint(&self.positions);
        log::debug!("Refreshing market data for {}", tickers.join(","));

        let (quotes, historical, dividends) = futures::join!(
            self.provider.get_quotes(&tickers),
            self.provider.get_historical(&tickers),
            self.provider.get_dividends(&tickers),
        );

        if matches!(quotes, Err(CoreError::SessionExpired))
            || matches!(historical, Err(CoreError::SessionExpired))
            || matches!(dividends, Err(CoreError::SessionExpired))
        {
            return Err(CoreError::SessionExpired);
        }

        let mut report = RefreshReport::default();

        match quotes {
            Ok(quotes) => {
                report.quotes_applied = self.commit_quotes(quotes, &mut report.notices);
            }
            Err(e) => report.notices.push(fetch_failed(DataKind::Quote, &e)),
        }

        match historical {
            Ok(series) => {
                report.historical_loaded = self.commit_historical(series, &mut report.notices);
            }
            Err(e) => report.notices.push(fetch_failed(DataKind::Historical, &e)),
        }

        match dividends {
            Ok(series) => {
                report.dividends_loaded =
                    self.commit_dividends(series, fingerprint, &mut report.notices);
            }
            Err(e) => report.notices.push(fetch_failed(DataKind::Dividends, &e)),
        }

        log::info!(
            "Refresh done: {} quotes, {} histories, {} dividend series, {} notices",
            report.quotes_applied,
            report.historical_loaded,
            report.dividends_loaded,
            report.notices.len()
        );
        Ok(report)
    }

    /// Reload price history for every held ticker and drop history
    /// for tickers no longer held.
    pub async fn sync_historical(&mut self) -> Result<Vec<Notice>, CoreError> {
        let tickers = self.tickers();
        let mut notices = Vec::new();
        let series = self.fetch_historical(&tickers, &mut notices).await?;

        let held: HashSet<String> = tickers.into_iter().collect();
        self.historical.retain(|ticker, _| held.contains(ticker));
        self.returns.retain(|ticker, _| held.contains(ticker));
        self.commit_historical(series, &mut notices);
        Ok(notices)
    }

    /// Fetch dividend history if the set of held tickers changed since the
    /// last fetch. Returns without a request otherwise.
    pub async fn sync_dividends(&mut self) -> Result<Vec<Notice>, CoreError> {
        let fingerprint = self.position_service.fingerprint(&self.positions);
        if self.dividends_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            log::debug!("Dividend data already current for [{fingerprint}]");
            return Ok(Vec::new());
        }

        let tickers = self.tickers();
        if tickers.is_empty() {
            self.dividends.clear();
            self.dividends_fingerprint = Some(fingerprint);
            return Ok(Vec::new());
        }

        let mut notices = Vec::new();
        match self.provider.get_dividends(&tickers).await {
            Ok(series) => {
                self.commit_dividends(series, fingerprint, &mut notices);
            }
            Err(CoreError::SessionExpired) => return Err(CoreError::SessionExpired),
            Err(e) => notices.push(fetch_failed(DataKind::Dividends, &e)),
        }
        Ok(notices)
    }

    /// Price history of a held ticker.
    #[must_use]
    pub fn historical(&self, ticker: &str) -> Option<&[HistoricalPricePoint]> {
        self.historical
            .get(&normalize_ticker(ticker))
            .map(Vec::as_slice)
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Replace the position list with the one saved in `store`.
    /// Market data for tickers no longer held is dropped.
    /// Returns the number of positions loaded.
    pub async fn load_positions(&mut self, store: &dyn PositionStore) -> Result<usize, CoreError> {
        let rows = store.list_positions().await?;
        let loaded: Vec<Position> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let mut position = Position::from(row);
                if position.color.as_deref().map_or(true, str::is_empty) {
                    position.color = Some(color_service::position_color(&position, i));
                }
                position
            })
            .collect();

        self.positions = self
            .position_service
            .reduce(&[], PositionAction::Replace(loaded));
        let held: HashSet<String> = self.tickers().into_iter().collect();
        self.historical.retain(|ticker, _| held.contains(ticker));
        self.returns.retain(|ticker, _| held.contains(ticker));
        self.dirty = false;

        log::info!("Loaded {} positions", self.positions.len());
        Ok(self.positions.len())
    }

    /// Make `store` hold exactly the current positions: rows for tickers no
    /// longer held are deleted, the rest are upserted by ticker.
    /// Returns the number of positions saved.
    pub async fn save_positions(&mut self, store: &dyn PositionStore) -> Result<usize, CoreError> {
        let held: HashSet<String> = self.tickers().into_iter().collect();
        for row in store.list_positions().await? {
            if !held.contains(&normalize_ticker(&row.ticker)) {
                log::debug!("Deleting stored position {} ({})", row.ticker, row.id);
                store.delete_position(row.id).await?;
            }
        }

        let records = self.position_service.export(&self.positions);
        let saved = if records.is_empty() {
            0
        } else {
            store.import_positions(&records).await?.len()
        };
        self.dirty = false;

        log::info!("Saved {saved} positions");
        Ok(saved)
    }

    /// True if positions changed since the last load or save.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Valuation & Analytics ───────────────────────────────────────

    #[must_use]
    pub fn totals(&self) -> PortfolioTotals {
        self.valuation_service.totals(&self.positions)
    }

    /// Current value of one position, at its buy price if no quote is known.
    #[must_use]
    pub fn position_value(&self, ticker: &str) -> Option<f64> {
        self.position(ticker).map(|p| self.valuation_service.value(p))
    }

    /// Profit/loss of one position as `(amount, percent)`.
    #[must_use]
    pub fn position_profit_loss(&self, ticker: &str) -> Option<(f64, f64)> {
        self.position(ticker).map(|p| {
            (
                self.valuation_service.profit_loss(p),
                self.valuation_service.profit_loss_percent(p),
            )
        })
    }

    #[must_use]
    pub fn allocation(&self) -> Vec<AllocationSlice> {
        self.analytics_service.allocation(&self.positions)
    }

    #[must_use]
    pub fn performance_series(&self) -> Vec<PerformancePoint> {
        self.analytics_service
            .performance_series(&self.positions, &self.historical)
    }

    /// Annualized return per ticker with price history.
    #[must_use]
    pub fn historical_returns(&self) -> &HashMap<String, f64> {
        &self.returns
    }

    // ── Projection ──────────────────────────────────────────────────

    /// Project the portfolio `years` years ahead from the historical returns.
    /// Horizons above [`MAX_PROJECTION_YEARS`] are rejected.
    pub fn projection(&self, years: u32, mode: ProjectionMode) -> Result<Projection, CoreError> {
        if years > MAX_PROJECTION_YEARS {
            return Err(CoreError::Validation(format!(
                "Projection horizon of {years} years exceeds the maximum of {MAX_PROJECTION_YEARS}"
            )));
        }
        Ok(self
            .projection_service
            .project(&self.positions, &self.returns, years, mode))
    }

    /// Values in the last year of a projection.
    #[must_use]
    pub fn projection_final_values(&self, projection: &Projection) -> Option<FinalValues> {
        self.projection_service.final_values(projection)
    }

    // ── Dividends ───────────────────────────────────────────────────

    /// Dividend events for the current positions, by date then ticker.
    #[must_use]
    pub fn dividend_events(&self) -> Vec<DividendEvent> {
        self.dividend_service
            .build_events(&self.dividends, &self.positions)
    }

    #[must_use]
    pub fn dividend_summary(&self) -> DividendSummary {
        self.dividend_service.summary(&self.dividend_events())
    }

    #[must_use]
    pub fn dividend_events_by_year(&self, year: i32) -> Vec<DividendEvent> {
        let events = self.dividend_events();
        self.dividend_service
            .events_by_year(&events, year)
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn dividend_year_total(&self, year: i32) -> f64 {
        self.dividend_service
            .year_total(&self.dividend_events(), year)
    }

    /// Twelve rows, January to December.
    #[must_use]
    pub fn monthly_dividends(&self, year: i32) -> Vec<MonthlyDividendTotal> {
        self.dividend_service
            .monthly_totals(&self.dividend_events(), year)
    }

    /// Events of one month grouped by payment day.
    #[must_use]
    pub fn dividend_calendar(&self, year: i32, month: u32) -> BTreeMap<NaiveDate, Vec<DividendEvent>> {
        let events = self.dividend_events();
        self.dividend_service
            .events_by_day(&events, year, month)
            .into_iter()
            .map(|(day, events)| (day, events.into_iter().cloned().collect()))
            .collect()
    }

    /// Per-share payment history of every ticker with dividend data.
    #[must_use]
    pub fn dividend_histories(&self) -> Vec<TickerDividendHistory> {
        self.dividend_service.ticker_histories(&self.dividends)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(provider: Box<dyn MarketDataProvider>, settings: Settings) -> Self {
        let returns_service = ReturnsService::new(settings.annualization);

        Self {
            positions: Vec::new(),
            historical: HashMap::new(),
            returns: HashMap::new(),
            dividends: Vec::new(),
            dividends_fingerprint: None,
            settings,
            provider,
            position_service: PositionService::new(),
            valuation_service: ValuationService::new(),
            returns_service,
            projection_service: ProjectionService::new(),
            dividend_service: DividendService::new(),
            analytics_service: AnalyticsService::new(),
            dirty: false,
        }
    }

    /// Swap in the next position list as one snapshot.
    fn apply(&mut self, action: PositionAction) {
        self.positions = self.position_service.reduce(&self.positions, action);
        self.dirty = true;
    }

    /// Fetch price history without touching state. Only an expired session
    /// is an error; any other failure is reported as a notice.
    async fn fetch_historical(
        &self,
        tickers: &[String],
        notices: &mut Vec<Notice>,
    ) -> Result<Vec<HistoricalSeries>, CoreError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        match self.provider.get_historical(tickers).await {
            Ok(series) => Ok(series),
            Err(CoreError::SessionExpired) => Err(CoreError::SessionExpired),
            Err(e) => {
                notices.push(fetch_failed(DataKind::Historical, &e));
                Ok(Vec::new())
            }
        }
    }

    /// Merge quotes into the position list. Returns how many positions got a price.
    fn commit_quotes(&mut self, quotes: Vec<Quote>, notices: &mut Vec<Notice>) -> usize {
        for quote in &quotes {
            if quote.usable_price().is_none() {
                let reason = quote
                    .error
                    .clone()
                    .unwrap_or_else(|| "quote has no price".to_string());
                log::warn!("No usable quote for {}: {reason}", quote.ticker);
                notices.push(Notice::QuoteUnavailable {
                    ticker: normalize_ticker(&quote.ticker),
                    reason,
                });
            }
        }

        let priced: HashSet<String> = quotes
            .iter()
            .filter(|q| q.usable_price().is_some())
            .map(|q| normalize_ticker(&q.ticker))
            .collect();
        let applied = self
            .positions
            .iter()
            .filter(|p| priced.contains(&p.ticker))
            .count();

        // Prices are market data, not user edits: leave `dirty` alone.
        self.positions = self
            .position_service
            .reduce(&self.positions, PositionAction::ApplyQuotes(quotes));
        applied
    }

    /// Store usable series and their annualized returns.
    /// Returns how many tickers got a series.
    fn commit_historical(&mut self, series: Vec<HistoricalSeries>, notices: &mut Vec<Notice>) -> usize {
        let mut loaded = 0;
        for s in series {
            let ticker = normalize_ticker(&s.ticker);
            if let Some(error) = s.error {
                log::warn!("No historical data for {ticker}: {error}");
                notices.push(Notice::TickerDataMissing {
                    ticker,
                    kind: DataKind::Historical,
                    reason: error,
                });
                continue;
            }
            if s.historical.is_empty() {
                log::debug!("Empty price history for {ticker}");
                continue;
            }
            let annual = self.returns_service.historical_return(&s.historical);
            self.returns.insert(ticker.clone(), annual);
            self.historical.insert(ticker, s.historical);
            loaded += 1;
        }
        loaded
    }

    /// Replace the raw dividend data. Returns how many tickers have payments.
    fn commit_dividends(
        &mut self,
        series: Vec<DividendSeries>,
        fingerprint: String,
        notices: &mut Vec<Notice>,
    ) -> usize {
        let mut kept = Vec::with_capacity(series.len());
        for s in series {
            match s.error {
                Some(error) => {
                    log::warn!("No dividend data for {}: {error}", s.ticker);
                    notices.push(Notice::TickerDataMissing {
                        ticker: normalize_ticker(&s.ticker),
                        kind: DataKind::Dividends,
                        reason: error,
                    });
                }
                None => kept.push(s),
            }
        }
        let loaded = kept.iter().filter(|s| !s.dividends.is_empty()).count();
        self.dividends = kept;
        self.dividends_fingerprint = Some(fingerprint);
        loaded
    }
}

fn fetch_failed(kind: DataKind, error: &CoreError) -> Notice {
    log::warn!("Could not fetch {kind}: {error}");
    Notice::FetchFailed {
        kind,
        reason: error.to_string(),
    }
}
