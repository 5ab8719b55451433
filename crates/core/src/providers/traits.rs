use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::market::{DividendSeries, HistoricalSeries, Quote};
use crate::models::position::{
    ImportRecord, NewPersistedPosition, PersistedPosition, PersistedPositionUpdate,
};

/// Source of market data: quotes, price history and dividend history.
///
/// The REST backend implements this through [`MarketApi`](crate::api::market::MarketApi);
/// tests plug in in-memory implementations. Batch calls answer per ticker and
/// report per-ticker failures inline (`error` fields) rather than failing the
/// whole batch.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest quote for a single ticker.
    async fn get_quote(&self, ticker: &str) -> Result<Quote, CoreError>;

    /// Latest quotes for several tickers.
    async fn get_quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, CoreError>;

    /// Monthly close prices, ascending by date, per ticker.
    async fn get_historical(&self, tickers: &[String]) -> Result<Vec<HistoricalSeries>, CoreError>;

    /// Per-share dividend payments per ticker.
    async fn get_dividends(&self, tickers: &[String]) -> Result<Vec<DividendSeries>, CoreError>;
}

/// Server-side persistence of the user's positions.
///
/// Rows are keyed by a server-assigned id; `import_positions` upserts by ticker.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PositionStore: Send + Sync {
    async fn list_positions(&self) -> Result<Vec<PersistedPosition>, CoreError>;

    async fn get_position(&self, id: i64) -> Result<PersistedPosition, CoreError>;

    async fn create_position(
        &self,
        position: &NewPersistedPosition,
    ) -> Result<PersistedPosition, CoreError>;

    async fn update_position(
        &self,
        id: i64,
        update: &PersistedPositionUpdate,
    ) -> Result<PersistedPosition, CoreError>;

    async fn delete_position(&self, id: i64) -> Result<(), CoreError>;

    /// Create or update positions by ticker.
    async fn import_positions(
        &self,
        records: &[ImportRecord],
    ) -> Result<Vec<PersistedPosition>, CoreError>;

    async fn export_positions(&self) -> Result<Vec<ImportRecord>, CoreError>;
}
